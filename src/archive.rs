//! Opening and validating the file-valued fleet options.
//!
//! Paths coming out of the parser or a configuration file are only
//! materialized here, once the whole options record is known. The code
//! archive must be a well-formed tar file; the deploy key just has to be
//! readable.

use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tar::Archive;

/// Open `path` for binary reading.
pub fn open_binary(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("failed to open {}", path.display()))
}

/// Verify that `path` is a well-formed tar archive.
///
/// Reads just far enough to check the first entry header, naming the
/// offending path on failure. An archive with no entries at all (an
/// empty or zero-filled file) is rejected too; a leading all-zero block
/// is the end-of-archive marker, not a real archive.
pub fn validate_tar(path: &Path) -> Result<()> {
    let file = open_binary(path)?;
    let mut reader = Archive::new(file);
    let mut entries = reader.entries()?;
    match entries.next() {
        Some(Ok(_)) => Ok(()),
        Some(Err(err)) => bail!("file {} is not a tar archive: {err}", path.display()),
        None => bail!("file {} is not a tar archive", path.display()),
    }
}

/// Validate `path` as a tar archive and open it for binary reading.
pub fn open_tar(path: &Path) -> Result<File> {
    validate_tar(path)?;
    open_binary(path)
}

/// Test helper: write a minimal valid tar archive at `path`.
#[cfg(test)]
pub(crate) fn write_tar(path: &Path) {
    let mut builder = tar::Builder::new(File::create(path).unwrap());
    let mut header = tar::Header::new_gnu();
    header.set_size(5);
    builder
        .append_data(&mut header, "hello.txt", &b"hello"[..])
        .unwrap();
    builder.finish().unwrap();
}
