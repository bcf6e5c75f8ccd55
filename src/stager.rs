use std::path::{Path, PathBuf};

use crate::error::{Result, SellError};

/// Per-image size ceiling (5 MiB)
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// A file selected for upload but not yet sent to storage.
///
/// The local path doubles as the preview handle; nothing is persisted
/// beyond the session.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub path: PathBuf,
    pub display_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// Ordered collection of staged files. Order is significant: the broker
/// correlates upload targets to files purely by position.
#[derive(Debug, Default)]
pub struct FileStager {
    files: Vec<StagedFile>,
}

impl FileStager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a local file for upload.
    ///
    /// Rejects files larger than [`MAX_FILE_SIZE`] without touching the
    /// already-staged list; otherwise appends, preserving prior entries.
    pub fn accept(&mut self, path: &Path) -> Result<&StagedFile> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| SellError::from_io_error(e, &path.display().to_string()))?;
        let size_bytes = metadata.len();

        if size_bytes > MAX_FILE_SIZE {
            return Err(SellError::FileTooLarge {
                path: path.display().to_string(),
                size: size_bytes,
                max: MAX_FILE_SIZE,
            });
        }

        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        self.files.push(StagedFile {
            path: path.to_path_buf(),
            display_name,
            mime_type: detect_content_type(path),
            size_bytes,
        });

        Ok(self.files.last().unwrap())
    }

    /// Remove the entry at `index`, shifting later entries down.
    /// Out-of-range indices are a no-op.
    pub fn remove(&mut self, index: usize) {
        if index < self.files.len() {
            self.files.remove(index);
        }
    }

    pub fn files(&self) -> &[StagedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Drop all staged files (after a successful submit)
    pub fn clear(&mut self) {
        self.files.clear();
    }
}

/// Detect Content-Type based on file extension
///
/// Returns the MIME type for common image formats. Falls back to
/// "application/octet-stream" for unknown types.
pub fn detect_content_type(path: &Path) -> String {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, len: usize) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&vec![0u8; len]).unwrap();
        path
    }

    #[test]
    fn test_accept_preserves_order_and_count() {
        let dir = tempfile::tempdir().unwrap();
        let mut stager = FileStager::new();

        for name in ["a.jpg", "b.png", "c.webp", "d.gif", "e.jpeg"] {
            let path = write_file(&dir, name, 16);
            stager.accept(&path).unwrap();
        }

        assert_eq!(stager.len(), 5);
        let names: Vec<_> = stager.files().iter().map(|f| f.display_name.as_str()).collect();
        assert_eq!(names, ["a.jpg", "b.png", "c.webp", "d.gif", "e.jpeg"]);
    }

    #[test]
    fn test_oversized_file_rejected_siblings_kept() {
        let dir = tempfile::tempdir().unwrap();
        let mut stager = FileStager::new();

        let small = write_file(&dir, "small.jpg", 128);
        let big = write_file(&dir, "big.jpg", (MAX_FILE_SIZE + 1) as usize);
        let other = write_file(&dir, "other.png", 256);

        stager.accept(&small).unwrap();
        let err = stager.accept(&big).unwrap_err();
        assert!(matches!(err, SellError::FileTooLarge { .. }));
        stager.accept(&other).unwrap();

        assert_eq!(stager.len(), 2);
        assert_eq!(stager.files()[0].display_name, "small.jpg");
        assert_eq!(stager.files()[1].display_name, "other.png");
    }

    #[test]
    fn test_file_at_exact_limit_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let mut stager = FileStager::new();

        let path = write_file(&dir, "exact.png", MAX_FILE_SIZE as usize);
        stager.accept(&path).unwrap();
        assert_eq!(stager.len(), 1);
        assert_eq!(stager.files()[0].size_bytes, MAX_FILE_SIZE);
    }

    #[test]
    fn test_missing_file_maps_to_not_found() {
        let mut stager = FileStager::new();
        let err = stager.accept(Path::new("/nonexistent/photo.jpg")).unwrap_err();
        assert!(matches!(err, SellError::FileNotFound { .. }));
        assert!(stager.is_empty());
    }

    #[test]
    fn test_remove_shifts_and_is_idempotent_per_intent() {
        let dir = tempfile::tempdir().unwrap();
        let mut stager = FileStager::new();
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            let path = write_file(&dir, name, 8);
            stager.accept(&path).unwrap();
        }

        stager.remove(1); // drops b, c shifts to index 1
        assert_eq!(stager.len(), 2);
        assert_eq!(stager.files()[1].display_name, "c.jpg");

        // Repeating the same index must not cascade past the intended delete
        stager.remove(2); // now out of range: no-op
        assert_eq!(stager.len(), 2);

        stager.remove(99); // far out of range: no-op
        assert_eq!(stager.len(), 2);
        let names: Vec<_> = stager.files().iter().map(|f| f.display_name.as_str()).collect();
        assert_eq!(names, ["a.jpg", "c.jpg"]);
    }

    #[test]
    fn test_detect_content_type_images() {
        assert_eq!(
            detect_content_type(Path::new("photo.jpg")),
            "image/jpeg"
        );
        assert_eq!(detect_content_type(Path::new("photo.JPG")), "image/jpeg");
        assert_eq!(detect_content_type(Path::new("image.png")), "image/png");
        assert_eq!(detect_content_type(Path::new("anim.webp")), "image/webp");
    }

    #[test]
    fn test_detect_content_type_unknown() {
        assert_eq!(
            detect_content_type(Path::new("file.unknown")),
            "application/octet-stream"
        );
        assert_eq!(
            detect_content_type(Path::new("no_extension")),
            "application/octet-stream"
        );
    }
}
