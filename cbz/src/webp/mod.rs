use std::io::Write;

use camino::Utf8Path;
use tracing::{debug, info};

use crate::{
    image::{ycbcr_image_to_rgb, PixelBuffer},
    output::OutputFile,
    Error, Result,
};

pub use self::codec::WebPMemory;

pub mod codec;

/// Quality at and above which encoding is lossless
pub static LOSSLESS_QUALITY: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WebpOptions {
    /// Lossy quality from 0 to 99, anything above means lossless
    pub quality: u32,
    /// Resize factor, not positive or `1.0` keeps the original size
    pub scale: f32,
}

impl Default for WebpOptions {
    fn default() -> Self {
        Self {
            quality: 90,
            scale: 1.0,
        }
    }
}

/// Encodes the buffer, keeping its alpha channel if any.
/// `YCbCr` buffers are converted to RGB first.
///
/// ## Errors
///
/// Fails if libwebp can't encode the buffer
pub fn encode(buffer: &PixelBuffer, quality: u32) -> Result<WebPMemory> {
    let lossless = quality >= LOSSLESS_QUALITY;
    debug!(
        "encoding {buffer} {}",
        if lossless { "lossless" } else { "lossy" }
    );

    match buffer {
        PixelBuffer::Rgba(rgba) => {
            let (width, height) = rgba.dimensions();
            if lossless {
                codec::encode_lossless_rgba(rgba.as_raw(), width, height, buffer.stride())
            } else {
                codec::encode_rgba(
                    rgba.as_raw(),
                    width,
                    height,
                    buffer.stride(),
                    lossy_quality(quality),
                )
            }
        }
        PixelBuffer::Rgb(rgb) => encode_rgb(rgb.as_raw(), width_height(buffer), quality),
        PixelBuffer::YCbCr(samples) => {
            let rgb = ycbcr_image_to_rgb(samples);
            encode_rgb(rgb.as_raw(), width_height(buffer), quality)
        }
    }
}

fn width_height(buffer: &PixelBuffer) -> (u32, u32) {
    (buffer.width(), buffer.height())
}

fn encode_rgb(pixels: &[u8], (width, height): (u32, u32), quality: u32) -> Result<WebPMemory> {
    let stride = width as usize * 3;
    if quality >= LOSSLESS_QUALITY {
        codec::encode_lossless_rgb(pixels, width, height, stride)
    } else {
        codec::encode_rgb(pixels, width, height, stride, lossy_quality(quality))
    }
}

#[allow(clippy::cast_precision_loss)]
fn lossy_quality(quality: u32) -> f32 {
    quality.min(LOSSLESS_QUALITY) as f32
}

/// Reads the image at `src` and writes it as WebP to `dst`, resized by `options.scale`.
/// `dst` is only replaced once the whole image is written.
///
/// ## Errors
///
/// Fails if `src` can't be read or decoded, if its pixel layout is unsupported,
/// if the scaled image is too large for WebP, or if the WebP can't be encoded or written
pub fn transcode(
    src: impl AsRef<Utf8Path>,
    dst: impl AsRef<Utf8Path>,
    options: WebpOptions,
) -> Result<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    let buffer = PixelBuffer::open(src)?.scale(options.scale)?;
    let webp = encode(&buffer, options.quality)?;

    let mut output = OutputFile::create(dst)?;
    output.write_all(&webp).map_err(Error::Write)?;
    output.persist()?;
    info!("converted {src} to {dst} ({} bytes)", webp.len());

    Ok(())
}
