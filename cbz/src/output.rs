//! Output files that only appear at their destination once fully written.
//!
//! Content goes to a temporary file next to the destination, which is renamed
//! over it on `OutputFile::persist`. Dropping an `OutputFile` that wasn't
//! persisted removes the temporary file, so failed writes leave nothing behind.

use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{Error, Result};

#[cfg(unix)]
const OUTPUT_MODE: u32 = 0o666;

pub struct OutputFile {
    file: NamedTempFile,
    path: Utf8PathBuf,
}

impl OutputFile {
    /// Creates the temporary file backing `path` in the same directory
    ///
    /// ## Errors
    ///
    /// Fails with `Error::Write` if the temporary file can't be created
    pub fn create(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let dir = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };

        let mut builder = tempfile::Builder::new();
        builder.prefix(".cbz-").suffix(".tmp");
        #[cfg(unix)]
        {
            use std::{fs::Permissions, os::unix::fs::PermissionsExt};

            builder.permissions(Permissions::from_mode(OUTPUT_MODE));
        }
        let file = builder.tempfile_in(dir).map_err(Error::Write)?;
        debug!("writing {path} through {}", file.path().display());

        Ok(Self { file, path })
    }

    /// Flushes and renames the temporary file over the destination
    ///
    /// ## Errors
    ///
    /// Fails with `Error::Write` if the rename fails, the temporary file is removed
    pub fn persist(mut self) -> Result<Utf8PathBuf> {
        self.file.flush().map_err(Error::Write)?;
        self.file
            .persist(&self.path)
            .map_err(|err| Error::Write(err.error))?;

        Ok(self.path)
    }
}

impl Write for OutputFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn utf8_dir(tmp: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap()
    }

    #[test]
    fn persist_replaces_destination() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = utf8_dir(&tmp).join("out.bin");
        fs::write(&path, b"previous content that is longer").unwrap();

        let mut output = OutputFile::create(&path).unwrap();
        output.write_all(b"new").unwrap();
        let persisted = output.persist().unwrap();

        assert_eq!(persisted, path);
        assert_eq!(fs::read(&path).unwrap(), b"new");
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn drop_without_persist_leaves_nothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = utf8_dir(&tmp).join("out.bin");

        let mut output = OutputFile::create(&path).unwrap();
        output.write_all(b"partial").unwrap();
        drop(output);

        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn drop_keeps_previous_destination() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = utf8_dir(&tmp).join("out.bin");
        fs::write(&path, b"previous").unwrap();

        let mut output = OutputFile::create(&path).unwrap();
        output.write_all(b"partial").unwrap();
        drop(output);

        assert_eq!(fs::read(&path).unwrap(), b"previous");
    }

    #[test]
    fn missing_directory_is_a_write_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = utf8_dir(&tmp).join("missing").join("out.bin");

        assert!(matches!(OutputFile::create(path), Err(Error::Write(_))));
    }

    #[cfg(unix)]
    #[test]
    fn output_mode_matches_plain_create() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let path = utf8_dir(&tmp).join("out.bin");
        let reference = utf8_dir(&tmp).join("reference.bin");

        OutputFile::create(&path).unwrap().persist().unwrap();
        fs::File::create(&reference).unwrap();

        let mode = |path: &Utf8Path| fs::metadata(path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&path), mode(&reference));
    }
}
