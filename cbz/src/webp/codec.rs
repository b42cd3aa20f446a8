//! The libwebp boundary. Nothing outside this module handles memory owned by libwebp.

use std::{
    ffi::c_int,
    fmt,
    ops::Deref,
    ptr::{self, NonNull},
    slice,
};

use image::RgbaImage;
use libwebp_sys::{
    WebPDecodeRGBA, WebPEncodeLosslessRGB, WebPEncodeLosslessRGBA, WebPEncodeRGB, WebPEncodeRGBA,
    WebPFree, WEBP_MAX_DIMENSION,
};

use crate::{Error, Result};

/// Largest width or height libwebp encodes
pub const MAX_DIMENSION: u32 = WEBP_MAX_DIMENSION;

/// A buffer allocated by libwebp, released with `WebPFree` when dropped
pub struct WebPMemory {
    ptr: NonNull<u8>,
    len: usize,
}

impl WebPMemory {
    /// Takes ownership of a libwebp allocation.
    /// Returns `None` for a null pointer; an empty allocation is released immediately.
    ///
    /// ## Safety
    ///
    /// `ptr` must be null or point to `len` initialized bytes allocated by libwebp,
    /// and must not be released by anyone else
    unsafe fn from_raw(ptr: *mut u8, len: usize) -> Option<Self> {
        let ptr = NonNull::new(ptr)?;
        if len == 0 {
            unsafe { WebPFree(ptr.as_ptr().cast()) };
            return None;
        }

        #[cfg(test)]
        live::acquire();

        Some(Self { ptr, len })
    }
}

impl Deref for WebPMemory {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl AsRef<[u8]> for WebPMemory {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl Drop for WebPMemory {
    fn drop(&mut self) {
        unsafe { WebPFree(self.ptr.as_ptr().cast()) };

        #[cfg(test)]
        live::release();
    }
}

impl fmt::Debug for WebPMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebPMemory").field("len", &self.len).finish()
    }
}

/// Checks the pixel buffer against its declared geometry before handing it to libwebp
fn encode_with(
    pixels: &[u8],
    width: u32,
    height: u32,
    stride: usize,
    channels: usize,
    encode: impl FnOnce(*const u8, c_int, c_int, c_int, *mut *mut u8) -> usize,
) -> Result<WebPMemory> {
    if width == 0 || height == 0 {
        return Err(Error::Encode("empty image"));
    }
    let row = (width as usize).checked_mul(channels);
    if row.map_or(true, |row| stride < row) {
        return Err(Error::Encode("stride shorter than a row"));
    }
    if (height as usize)
        .checked_mul(stride)
        .map_or(true, |size| pixels.len() < size)
    {
        return Err(Error::Encode("pixel buffer smaller than stride * height"));
    }
    let (Ok(width), Ok(height), Ok(stride)) = (
        c_int::try_from(width),
        c_int::try_from(height),
        c_int::try_from(stride),
    ) else {
        return Err(Error::Encode("image too large"));
    };

    let mut output = ptr::null_mut();
    let len = encode(pixels.as_ptr(), width, height, stride, &mut output);

    unsafe { WebPMemory::from_raw(output, len) }.ok_or(Error::Encode("codec returned no data"))
}

/// Lossy encoding of packed RGB pixels, `quality` from 0 to 100
///
/// ## Errors
///
/// Fails if the geometry doesn't match `pixels` or if libwebp produces nothing
pub fn encode_rgb(
    pixels: &[u8],
    width: u32,
    height: u32,
    stride: usize,
    quality: f32,
) -> Result<WebPMemory> {
    encode_with(pixels, width, height, stride, 3, |rgb, w, h, s, output| unsafe {
        WebPEncodeRGB(rgb, w, h, s, quality, output)
    })
}

/// Lossy encoding of packed RGBA pixels, `quality` from 0 to 100
///
/// ## Errors
///
/// Fails if the geometry doesn't match `pixels` or if libwebp produces nothing
pub fn encode_rgba(
    pixels: &[u8],
    width: u32,
    height: u32,
    stride: usize,
    quality: f32,
) -> Result<WebPMemory> {
    encode_with(pixels, width, height, stride, 4, |rgba, w, h, s, output| unsafe {
        WebPEncodeRGBA(rgba, w, h, s, quality, output)
    })
}

/// ## Errors
///
/// Fails if the geometry doesn't match `pixels` or if libwebp produces nothing
pub fn encode_lossless_rgb(
    pixels: &[u8],
    width: u32,
    height: u32,
    stride: usize,
) -> Result<WebPMemory> {
    encode_with(pixels, width, height, stride, 3, |rgb, w, h, s, output| unsafe {
        WebPEncodeLosslessRGB(rgb, w, h, s, output)
    })
}

/// ## Errors
///
/// Fails if the geometry doesn't match `pixels` or if libwebp produces nothing
pub fn encode_lossless_rgba(
    pixels: &[u8],
    width: u32,
    height: u32,
    stride: usize,
) -> Result<WebPMemory> {
    encode_with(pixels, width, height, stride, 4, |rgba, w, h, s, output| unsafe {
        WebPEncodeLosslessRGBA(rgba, w, h, s, output)
    })
}

/// Decodes a WebP image to RGBA, the libwebp buffer is released once copied
///
/// ## Errors
///
/// Fails if libwebp can't decode `bytes`
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage> {
    let mut width: c_int = 0;
    let mut height: c_int = 0;
    let pixels = unsafe { WebPDecodeRGBA(bytes.as_ptr(), bytes.len(), &mut width, &mut height) };
    let len = usize::try_from(width).unwrap_or(0) * usize::try_from(height).unwrap_or(0) * 4;
    let memory = unsafe { WebPMemory::from_raw(pixels, len) }.ok_or(Error::DecodeWebp)?;
    let (Ok(width), Ok(height)) = (u32::try_from(width), u32::try_from(height)) else {
        return Err(Error::DecodeWebp);
    };

    RgbaImage::from_raw(width, height, memory.to_vec()).ok_or(Error::DecodeWebp)
}
