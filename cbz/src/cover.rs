use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use crate::{extension, output::OutputFile, CbzRead, CbzReader, Error, Result};

/// Name of the extracted cover: the archive base name with its first `.cbz`
/// replaced by the extension of the selected entry.
/// Returns `None` when the archive path has no file name.
#[must_use]
pub fn cover_file_name(archive_path: impl AsRef<Utf8Path>, entry_name: &str) -> Option<String> {
    let archive_name = archive_path.as_ref().file_name()?;
    let ext = extension(entry_name).unwrap_or_default();

    Some(archive_name.replacen(".cbz", ext, 1))
}

/// Extracts the first image (in byte-wise name order) of the archive into `outdir`.
/// Returns the path of the created file.
///
/// ## Errors
///
/// Fails if the archive can't be open, contains no image, or if the
/// image can't be read from the archive or written to `outdir`.
/// Nothing is created in `outdir` on failure.
pub fn extract_cover(
    archive_path: impl AsRef<Utf8Path>,
    outdir: impl AsRef<Utf8Path>,
) -> Result<Utf8PathBuf> {
    let archive_path = archive_path.as_ref();
    let mut cbz = CbzReader::from_path(archive_path)?;

    let Some(cover_name) = cbz.cover_name()? else {
        return Err(Error::NoImageFound(archive_path.to_path_buf()));
    };
    debug!("selected cover {cover_name}");

    let Some(file_name) = cover_file_name(archive_path, &cover_name) else {
        return Err(Error::ArchiveName(archive_path.to_path_buf()));
    };

    let mut cover = cbz.read_by_name(&cover_name)?;
    let mut output = OutputFile::create(outdir.as_ref().join(file_name))?;
    let copied = cover.copy_to(&mut output)?;
    let path = output.persist()?;
    info!("extracted {cover_name} ({copied} bytes) to {path}");

    Ok(path)
}
