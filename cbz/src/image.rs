use std::{fmt, fs};

use camino::Utf8Path;
use image::{DynamicImage, ImageBuffer, ImageFormat, Pixel, RgbImage, RgbaImage};
use jpeg_decoder::{ColorTransform, PixelFormat};
use tracing::debug;

use crate::{jpeg::FrameHeader, webp::codec, Error, Result};

/// A decoded image, in one of the pixel layouts the WebP encoder accepts
#[derive(Debug, Clone, PartialEq)]
pub enum PixelBuffer {
    Rgb(RgbImage),
    Rgba(RgbaImage),
    /// Full resolution Y, Cb, Cr samples, one triple per pixel, as stored in a JPEG
    YCbCr(RgbImage),
}

impl PixelBuffer {
    /// ## Errors
    ///
    /// Fails if the file can't be read or decoded
    pub fn open(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let bytes = fs::read(path.as_ref()).map_err(Error::Read)?;

        Self::decode(&bytes)
    }

    /// Decodes the bytes, guessing their format from the content.
    /// Jpegs keep their luma/chroma samples when they can, WebPs are decoded by libwebp,
    /// everything else goes through the `image` crate.
    ///
    /// ## Errors
    ///
    /// Fails if the format is unknown, the data is corrupt, or the decoded
    /// pixel layout isn't 8 bits RGB, RGBA, or YCbCr
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let format = image::guess_format(bytes)?;
        debug!("decoding {format:?} image");

        match format {
            ImageFormat::Jpeg => Self::decode_jpeg(bytes),
            ImageFormat::WebP => codec::decode_rgba(bytes).map(Self::Rgba),
            format => image::load_from_memory_with_format(bytes, format)?.try_into(),
        }
    }

    /// Jpegs stored as Y, Cb, Cr keep their samples when the decoder can return them
    /// unconverted, which it can't for horizontally subsampled chroma.
    /// Everything else is colour converted by the decoder.
    fn decode_jpeg(bytes: &[u8]) -> Result<Self> {
        let header = FrameHeader::parse(bytes);
        let keep_samples = !header.stores_rgb() && !header.is_horizontally_subsampled();

        let mut decoder = jpeg_decoder::Decoder::new(bytes);
        if keep_samples {
            decoder.set_color_transform(ColorTransform::None);
        }
        let samples = decoder.decode()?;
        let Some(info) = decoder.info() else {
            return Err(jpeg_decoder::Error::Format("missing frame header".to_string()).into());
        };
        let (width, height) = (u32::from(info.width), u32::from(info.height));

        let buffer = match info.pixel_format {
            PixelFormat::RGB24 if keep_samples => {
                let samples = interleave_rows(&samples, usize::from(info.width));
                RgbImage::from_raw(width, height, samples).map(Self::YCbCr)
            }
            PixelFormat::RGB24 => RgbImage::from_raw(width, height, samples).map(Self::Rgb),
            pixel_format => {
                return Err(Error::UnsupportedFormat(format!("jpeg {pixel_format:?}")));
            }
        };

        buffer.ok_or_else(|| {
            Error::DecodeJpeg(jpeg_decoder::Error::Format(
                "truncated samples".to_string(),
            ))
        })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        match self {
            Self::Rgb(buffer) | Self::YCbCr(buffer) => buffer.width(),
            Self::Rgba(buffer) => buffer.width(),
        }
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        match self {
            Self::Rgb(buffer) | Self::YCbCr(buffer) => buffer.height(),
            Self::Rgba(buffer) => buffer.height(),
        }
    }

    /// Row length in bytes
    #[must_use]
    pub fn stride(&self) -> usize {
        let channels = match self {
            Self::Rgb(_) | Self::YCbCr(_) => 3,
            Self::Rgba(_) => 4,
        };

        self.width() as usize * channels
    }

    /// Nearest-neighbor resize to exactly `width` x `height`
    fn resize(&self, width: u32, height: u32) -> Self {
        match self {
            Self::Rgb(buffer) => Self::Rgb(resize_nearest(buffer, width, height)),
            Self::Rgba(buffer) => Self::Rgba(resize_nearest(buffer, width, height)),
            Self::YCbCr(buffer) => Self::YCbCr(resize_nearest(buffer, width, height)),
        }
    }

    /// Multiplies both dimensions by `scale`, rounding to the closest pixel.
    /// A `scale` that is not positive, or exactly `1.0`, leaves the image untouched.
    ///
    /// ## Errors
    ///
    /// Fails with `Error::Encode`, before allocating anything, if a scaled
    /// dimension is larger than WebP allows
    #[allow(clippy::float_cmp)]
    pub fn scale(self, scale: f32) -> Result<Self> {
        if !(scale > 0.0) || scale == 1.0 {
            return Ok(self);
        }

        let (Some(width), Some(height)) = (
            scale_dimension(self.width(), scale),
            scale_dimension(self.height(), scale),
        ) else {
            return Err(Error::Encode("scaled image is larger than WebP allows"));
        };
        debug!(
            "resizing {}x{} to {width}x{height}",
            self.width(),
            self.height()
        );

        Ok(self.resize(width, height))
    }
}

impl TryFrom<DynamicImage> for PixelBuffer {
    type Error = Error;

    fn try_from(image: DynamicImage) -> Result<Self> {
        match image {
            DynamicImage::ImageRgb8(buffer) => Ok(Self::Rgb(buffer)),
            DynamicImage::ImageRgba8(buffer) => Ok(Self::Rgba(buffer)),
            image => Err(Error::UnsupportedFormat(format!("{:?}", image.color()))),
        }
    }
}

impl fmt::Display for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layout = match self {
            Self::Rgb(_) => "rgb",
            Self::Rgba(_) => "rgba",
            Self::YCbCr(_) => "ycbcr",
        };

        write!(f, "{}x{} {layout}", self.width(), self.height())
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn scale_dimension(dimension: u32, scale: f32) -> Option<u32> {
    let scaled = (f64::from(dimension) * f64::from(scale)).round();
    if scaled > f64::from(codec::MAX_DIMENSION) {
        return None;
    }

    Some((scaled as u32).max(1))
}

/// Rows of the form `Y... Cb... Cr...` to one Y, Cb, Cr triple per pixel
fn interleave_rows(planar: &[u8], width: usize) -> Vec<u8> {
    let mut interleaved = Vec::with_capacity(planar.len());
    if width == 0 {
        return interleaved;
    }

    for row in planar.chunks_exact(width * 3) {
        let (luma, chroma) = row.split_at(width);
        let (blue, red) = chroma.split_at(width);
        for ((y, cb), cr) in luma.iter().zip(blue).zip(red) {
            interleaved.extend_from_slice(&[*y, *cb, *cr]);
        }
    }

    interleaved
}

#[allow(clippy::cast_possible_truncation)]
fn resize_nearest<P: Pixel>(
    source: &ImageBuffer<P, Vec<P::Subpixel>>,
    width: u32,
    height: u32,
) -> ImageBuffer<P, Vec<P::Subpixel>> {
    let (source_width, source_height) = source.dimensions();

    ImageBuffer::from_fn(width, height, |x, y| {
        let source_x = u64::from(x) * u64::from(source_width) / u64::from(width);
        let source_y = u64::from(y) * u64::from(source_height) / u64::from(height);
        *source.get_pixel(source_x as u32, source_y as u32)
    })
}

/// JFIF full range conversion, in 16.16 fixed point
#[must_use]
pub fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> [u8; 3] {
    let y = i32::from(y) * 0x10101;
    let cb = i32::from(cb) - 128;
    let cr = i32::from(cr) - 128;

    let clamp = |value: i32| u8::try_from((value >> 16).clamp(0, 255)).unwrap_or(u8::MAX);

    [
        clamp(y + 91_881 * cr),
        clamp(y - 22_554 * cb - 46_802 * cr),
        clamp(y + 116_130 * cb),
    ]
}

/// Converts every Y, Cb, Cr triple of `samples` to RGB
#[must_use]
pub fn ycbcr_image_to_rgb(samples: &RgbImage) -> RgbImage {
    let mut rgb = samples.clone();
    for pixel in rgb.pixels_mut() {
        let [y, cb, cr] = pixel.0;
        pixel.0 = ycbcr_to_rgb(y, cb, cr);
    }

    rgb
}
