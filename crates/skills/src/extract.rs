use std::path::Path;

use anyhow::Context;

/// Extract a zip archive into `dest`, creating it if needed.
///
/// Fails when the archive is unreadable or corrupt; on success an arbitrary
/// directory tree sits under `dest` for discovery to scan. Entry paths are
/// sanitized by the zip crate, so archives cannot escape `dest`.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::open(archive_path)
        .with_context(|| format!("opening archive {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("corrupt archive {}", archive_path.display()))?;
    std::fs::create_dir_all(dest)?;
    archive
        .extract(dest)
        .with_context(|| format!("extracting {}", archive_path.display()))?;
    Ok(())
}

/// True when a file name designates a zip upload.
pub fn is_zip(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}
