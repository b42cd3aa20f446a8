use std::{io, result};

use camino::Utf8PathBuf;
use zip::result::ZipError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cbz couldn't be opened: {0}")]
    Open(#[from] ZipError),

    #[error("Cbz path {0} has no file name")]
    ArchiveName(Utf8PathBuf),

    #[error("No image found in cbz {0}")]
    NoImageFound(Utf8PathBuf),

    #[error("Cbz entry {name} couldn't be read: {source}")]
    Entry {
        name: String,
        #[source]
        source: ZipError,
    },

    #[error("Read error {0}")]
    Read(#[source] io::Error),

    #[error("Write error {0}")]
    Write(#[source] io::Error),

    #[error("Image decoding error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Jpeg decoding error: {0}")]
    DecodeJpeg(#[from] jpeg_decoder::Error),

    #[error("WebP decoding failed")]
    DecodeWebp,

    #[error("Unsupported pixel format {0}")]
    UnsupportedFormat(String),

    #[error("WebP encoding failed: {0}")]
    Encode(&'static str),
}

pub type Result<T, E = Error> = result::Result<T, E>;
