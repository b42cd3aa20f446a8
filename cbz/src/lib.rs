#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::{
    fs::File,
    io::{self, BufReader, Cursor, Read, Seek, Write},
    path::Path,
};

use zip::{read::ZipFile, result::ZipError, ZipArchive};

pub use crate::cover::{cover_file_name, extract_cover};
pub use crate::errors::{Error, Result};

pub mod cover;
pub mod errors;
pub mod image;
mod jpeg;
pub mod output;
pub mod webp;

/// Extensions, dot included, of the entries that can be picked as a cover.
/// Matching is case-sensitive.
pub static IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];

/// Extension of the last segment of an archive entry name, starting at its final dot
#[must_use]
pub fn extension(name: &str) -> Option<&str> {
    let segment = name.rsplit('/').next().unwrap_or(name);
    segment.rfind('.').map(|index| &segment[index..])
}

pub trait Cbz {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CbzEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

impl CbzEntry {
    #[must_use]
    pub fn is_image(&self) -> bool {
        !self.is_dir && extension(&self.name).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext))
    }
}

pub trait CbzRead: Cbz {
    /// All the entries in archive order, directories included
    ///
    /// ## Errors
    ///
    /// Fails if an entry header can't be read
    fn entries(&mut self) -> Result<Vec<CbzEntry>>;

    /// Lookup the file by `name` in Cbz and returns a `CbzFile`
    ///
    /// ## Errors
    ///
    /// Fails if no such entry exists or if its content can't be accessed
    fn read_by_name(&mut self, name: &str) -> Result<CbzFile<'_>>;

    /// Name of the cover: the byte-wise smallest image entry name.
    /// Non image entries never take part in the selection, even if they sort first.
    ///
    /// ## Errors
    ///
    /// Same as `entries`
    fn cover_name(&mut self) -> Result<Option<String>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(CbzEntry::is_image)
            .map(|entry| entry.name)
            .min())
    }
}

pub struct CbzFile<'a>(ZipFile<'a>);

impl<'a> CbzFile<'a> {
    /// Stream the decompressed content of the file to the provided `Write`
    ///
    /// ## Errors
    ///
    /// Reading the entry fails with `Error::Read`, writing with `Error::Write`
    pub fn copy_to(&mut self, writer: &mut impl Write) -> Result<u64> {
        let mut writer = WriteErrors::new(writer);

        io::copy(&mut self.0, &mut writer).map_err(|err| match writer.error.take() {
            Some(write_error) => Error::Write(write_error),
            None => Error::Read(err),
        })
    }
}

impl<'a> From<ZipFile<'a>> for CbzFile<'a> {
    fn from(zip_file: ZipFile<'a>) -> Self {
        Self(zip_file)
    }
}

/// Keeps the errors of the wrapped writer, `io::copy` alone can't tell them from read errors
struct WriteErrors<'w, W> {
    inner: &'w mut W,
    error: Option<io::Error>,
}

impl<'w, W: Write> WriteErrors<'w, W> {
    fn new(inner: &'w mut W) -> Self {
        Self { inner, error: None }
    }

    fn keep<T>(&mut self, result: io::Result<T>) -> io::Result<T> {
        result.map_err(|err| {
            let kind = err.kind();
            if kind != io::ErrorKind::Interrupted {
                self.error = Some(err);
            }
            io::Error::from(kind)
        })
    }
}

impl<'w, W: Write> Write for WriteErrors<'w, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let result = self.inner.write(buf);
        self.keep(result)
    }

    fn flush(&mut self) -> io::Result<()> {
        let result = self.inner.flush();
        self.keep(result)
    }
}

#[derive(Debug)]
pub struct CbzReader<R> {
    archive: ZipArchive<R>,
}

impl<R> CbzReader<R> {
    pub fn new(archive: ZipArchive<R>) -> Self {
        Self { archive }
    }
}

impl<R> CbzReader<R>
where
    R: Read + Seek,
{
    /// Creates `CbzReader` from a `Read`
    ///
    /// ## Errors
    ///
    /// Fails if the underlying `ZipArchive` can't be created
    pub fn from_reader(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;

        Ok(Self::new(archive))
    }
}

impl CbzReader<BufReader<File>> {
    /// Creates `CbzReader` from a path
    ///
    /// ## Errors
    ///
    /// Fails if the file can't be open or if the underlying `ZipArchive` can't be created
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(ZipError::Io)?;

        Self::from_reader(BufReader::new(file))
    }
}

impl<'a> CbzReader<Cursor<&'a [u8]>> {
    /// Creates `CbzReader` from a bytes slice
    ///
    /// ## Errors
    ///
    /// Fails if the underlying `ZipArchive` can't be created
    pub fn from_bytes_slice(bytes: &'a [u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }
}

impl<R> Cbz for CbzReader<R>
where
    R: Read + Seek,
{
    fn len(&self) -> usize {
        self.archive.len()
    }
}

impl<R> CbzRead for CbzReader<R>
where
    R: Read + Seek,
{
    fn entries(&mut self) -> Result<Vec<CbzEntry>> {
        (0..self.archive.len())
            .map(|index| {
                self.archive
                    .by_index_raw(index)
                    .map(|file| CbzEntry {
                        name: file.name().to_string(),
                        is_dir: file.is_dir(),
                        size: file.size(),
                    })
                    .map_err(|source| Error::Entry {
                        name: format!("#{index}"),
                        source,
                    })
            })
            .collect()
    }

    fn read_by_name(&mut self, name: &str) -> Result<CbzFile<'_>> {
        let archive_file = self.archive.by_name(name).map_err(|source| Error::Entry {
            name: name.to_string(),
            source,
        })?;

        Ok(archive_file.into())
    }
}
