//! Local file attachments for chat and generation requests.
//!
//! Files are read and checked here, before anything is appended to the
//! conversation or sent over the network. A file that is too large or has an
//! extension outside the allow-list is rejected with an [`AttachmentError`]
//! whose message is suitable for showing directly to the user.

use std::path::Path;
use thiserror::Error;

/// MIME type used when an extension has no specific mapping.
const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("{name} is too large ({size} bytes). Files must be at most {max} bytes.")]
    TooLarge { name: String, size: u64, max: u64 },

    #[error("{name} has an unsupported file type. Allowed: {allowed}")]
    UnsupportedType { name: String, allowed: String },

    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Size cap and extension allow-list applied to every attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPolicy {
    max_bytes: u64,
    /// Lowercase, without the leading dot.
    allowed_extensions: Vec<String>,
}

impl AttachmentPolicy {
    pub fn new(max_bytes: u64, allowed_extensions: &[String]) -> Self {
        Self {
            max_bytes,
            allowed_extensions: allowed_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn allows_extension(&self, name: &str) -> bool {
        extension_of(name)
            .map(|ext| self.allowed_extensions.iter().any(|a| *a == ext))
            .unwrap_or(false)
    }

    /// Checks a file's name and size against the policy.
    pub fn check(&self, name: &str, size: u64) -> Result<(), AttachmentError> {
        if !self.allows_extension(name) {
            return Err(AttachmentError::UnsupportedType {
                name: name.to_string(),
                allowed: self
                    .allowed_extensions
                    .iter()
                    .map(|e| format!(".{}", e))
                    .collect::<Vec<_>>()
                    .join(" "),
            });
        }
        if size > self.max_bytes {
            return Err(AttachmentError::TooLarge {
                name: name.to_string(),
                size,
                max: self.max_bytes,
            });
        }
        Ok(())
    }
}

/// A validated file, held in memory until it is uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// Builds an attachment from bytes already in memory.
    pub fn from_bytes(
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        policy: &AttachmentPolicy,
    ) -> Result<Self, AttachmentError> {
        let file_name = file_name.into();
        policy.check(&file_name, bytes.len() as u64)?;
        Ok(Self {
            mime_type: mime_for(&file_name).to_string(),
            file_name,
            bytes,
        })
    }

    /// Reads and validates a file from disk.
    ///
    /// The size is checked from metadata first so oversized files are never
    /// read into memory.
    pub fn from_path(path: &Path, policy: &AttachmentPolicy) -> Result<Self, AttachmentError> {
        let io_err = |source| AttachmentError::Io {
            path: path.display().to_string(),
            source,
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let size = std::fs::metadata(path).map_err(io_err)?.len();
        policy.check(&file_name, size)?;

        let bytes = std::fs::read(path).map_err(io_err)?;
        Self::from_bytes(file_name, bytes, policy)
    }
}

/// Loads every path, stopping at the first rejected file.
pub fn load_all(paths: &[impl AsRef<Path>], policy: &AttachmentPolicy) -> Result<Vec<Attachment>, AttachmentError> {
    paths
        .iter()
        .map(|p| Attachment::from_path(p.as_ref(), policy))
        .collect()
}

/// Human-readable note appended to the user message listing attached files.
pub fn attachment_note(attachments: &[Attachment]) -> Option<String> {
    if attachments.is_empty() {
        return None;
    }
    let names: Vec<&str> = attachments.iter().map(|a| a.file_name.as_str()).collect();
    Some(format!("[Attached: {}]", names.join(", ")))
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

fn mime_for(name: &str) -> &'static str {
    match extension_of(name).as_deref() {
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("json") => "application/json",
        Some("js") | Some("jsx") => "text/javascript",
        Some("ts") | Some("tsx") => "text/typescript",
        Some("py") => "text/x-python",
        Some("css") => "text/css",
        Some("html") => "text/html",
        Some("xml") => "application/xml",
        Some("yaml") | Some("yml") => "application/yaml",
        Some("csv") => "text/csv",
        Some("pdf") => "application/pdf",
        _ => FALLBACK_MIME,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AttachmentConfig;

    fn policy() -> AttachmentPolicy {
        AttachmentConfig::default().policy()
    }

    #[test]
    fn accepts_allowed_extension_any_case() {
        let a = Attachment::from_bytes("Notes.MD", b"# hi".to_vec(), &policy()).unwrap();
        assert_eq!(a.mime_type, "text/markdown");
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = Attachment::from_bytes("app.exe", vec![0; 4], &policy()).unwrap_err();
        assert!(matches!(err, AttachmentError::UnsupportedType { .. }));
        let err = Attachment::from_bytes("Makefile", vec![0; 4], &policy()).unwrap_err();
        assert!(matches!(err, AttachmentError::UnsupportedType { .. }));
    }

    #[test]
    fn rejects_eleven_megabyte_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(11 * 1024 * 1024).unwrap();

        let err = Attachment::from_path(&path, &policy()).unwrap_err();
        match err {
            AttachmentError::TooLarge { name, size, max } => {
                assert_eq!(name, "big.txt");
                assert_eq!(size, 11 * 1024 * 1024);
                assert_eq!(max, 10 * 1024 * 1024);
            }
            other => panic!("expected TooLarge, got {:?}", other),
        }
    }

    #[test]
    fn exactly_at_limit_is_allowed() {
        let small = AttachmentPolicy::new(8, &["txt".to_string()]);
        assert!(small.check("a.txt", 8).is_ok());
        assert!(small.check("a.txt", 9).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Attachment::from_path(Path::new("/definitely/not/here.md"), &policy()).unwrap_err();
        assert!(matches!(err, AttachmentError::Io { .. }));
    }

    #[test]
    fn note_lists_file_names() {
        let p = policy();
        let files = vec![
            Attachment::from_bytes("a.py", b"x".to_vec(), &p).unwrap(),
            Attachment::from_bytes("b.md", b"y".to_vec(), &p).unwrap(),
        ];
        assert_eq!(attachment_note(&files).unwrap(), "[Attached: a.py, b.md]");
        assert!(attachment_note(&[]).is_none());
    }
}
