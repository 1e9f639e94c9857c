//! Local file ingestion: turn paths into inline attachments.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::chat::model::Attachment;
use crate::error::FileError;

/// Map a file extension to the MIME type sent inline with a request.
///
/// Only types the model accepts are listed; anything else is rejected
/// rather than uploaded with a guessed type.
pub fn detect_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "html" => "text/html",
        "xml" => "application/xml",
        _ => return None,
    };
    Some(mime)
}

/// Read one file into an [`Attachment`].
pub async fn read_attachment(path: &Path) -> Result<Attachment, FileError> {
    let mime_type = detect_mime(path).ok_or_else(|| FileError::UnsupportedType {
        path: path.display().to_string(),
    })?;

    let bytes = tokio::fs::read(path).await.map_err(|source| FileError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(Attachment::from_bytes(mime_type, &bytes, name))
}

/// Read many files, logging and omitting the ones that fail.
pub async fn collect_attachments(paths: &[PathBuf]) -> Vec<Attachment> {
    let mut attachments = Vec::with_capacity(paths.len());
    for path in paths {
        match read_attachment(path).await {
            Ok(attachment) => attachments.push(attachment),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping attachment"),
        }
    }
    attachments
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn detects_common_types_case_insensitively() {
        assert_eq!(detect_mime(Path::new("a.png")), Some("image/png"));
        assert_eq!(detect_mime(Path::new("b.JPEG")), Some("image/jpeg"));
        assert_eq!(detect_mime(Path::new("notes.md")), Some("text/markdown"));
        assert_eq!(detect_mime(Path::new("weird.exe")), None);
        assert_eq!(detect_mime(Path::new("no_extension")), None);
    }

    #[tokio::test]
    async fn reads_file_into_base64_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"hello")
            .unwrap();

        let attachment = read_attachment(&path).await.unwrap();
        assert_eq!(attachment.mime_type, "text/plain");
        assert_eq!(attachment.name, "hello.txt");
        assert_eq!(attachment.decode().unwrap(), b"hello");
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected() {
        let err = read_attachment(Path::new("binary.exe")).await.unwrap_err();
        assert!(matches!(err, FileError::UnsupportedType { .. }));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let err = read_attachment(Path::new("/nonexistent/x.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, FileError::Io { .. }));
    }

    #[tokio::test]
    async fn collect_skips_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("ok.txt");
        std::fs::write(&good, b"fine").unwrap();
        let missing = dir.path().join("gone.png");

        let attachments = collect_attachments(&[good, missing]).await;
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].name, "ok.txt");
    }
}
