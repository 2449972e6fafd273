//! Core types: staged files, selection events and transfer state.

use bytes::Bytes;
use mime::Mime;
use serde::Serialize;
use std::fmt;

#[cfg(not(target_arch = "wasm32"))]
use crate::errors::{SelectionError, UploadWidgetResult};
#[cfg(not(target_arch = "wasm32"))]
use std::path::{Path, PathBuf};

/// Where the bytes of a staged file come from.
#[derive(Clone)]
pub enum FileContent {
    /// In-memory content.
    Bytes(Bytes),

    /// File on disk, read when the upload starts.
    #[cfg(not(target_arch = "wasm32"))]
    Path(PathBuf),

    /// Browser file handle, handed to the request untouched.
    #[cfg(target_arch = "wasm32")]
    Blob(web_sys::File),
}

impl fmt::Debug for FileContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileContent::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            #[cfg(not(target_arch = "wasm32"))]
            FileContent::Path(path) => write!(f, "Path({})", path.display()),
            #[cfg(target_arch = "wasm32")]
            FileContent::Blob(_) => write!(f, "Blob"),
        }
    }
}

/// A file chosen by the user: name, size and a content source.
#[derive(Clone, Debug)]
pub struct FileHandle {
    name: String,
    size: u64,
    content_type: Option<Mime>,
    content: FileContent,
}

impl FileHandle {
    /// Creates a handle over in-memory content.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            content_type: None,
            content: FileContent::Bytes(bytes),
        }
    }

    /// Creates a handle over a file on disk, recording its current size.
    #[cfg(not(target_arch = "wasm32"))]
    pub async fn open(path: impl AsRef<Path>) -> UploadWidgetResult<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            SelectionError::FileUnreadable(format!("{}: {}", path.display(), e))
        })?;

        if !metadata.is_file() {
            return Err(
                SelectionError::FileUnreadable(format!("{}: not a file", path.display())).into(),
            );
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            name,
            size: metadata.len(),
            content_type: None,
            content: FileContent::Path(path.to_path_buf()),
        })
    }

    /// Creates a handle over a browser `File`.
    #[cfg(target_arch = "wasm32")]
    pub fn from_web_file(file: web_sys::File) -> Self {
        let content_type = file.type_().parse::<Mime>().ok();
        Self {
            name: file.name(),
            size: file.size() as u64,
            content_type,
            content: FileContent::Blob(file),
        }
    }

    /// Sets an explicit content type.
    pub fn with_content_type(mut self, content_type: Mime) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// File name as shown to the user and sent in the multipart part.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Explicit content type, if one was set.
    pub fn content_type(&self) -> Option<&Mime> {
        self.content_type.as_ref()
    }

    /// Content source.
    pub fn content(&self) -> &FileContent {
        &self.content
    }
}

/// Kind of a clipboard item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipboardItemKind {
    /// A file (for example a copied image).
    File,
    /// A string payload.
    String,
}

/// One entry of a paste payload.
#[derive(Clone, Debug)]
pub struct ClipboardItem {
    /// Item kind as reported by the clipboard.
    pub kind: ClipboardItemKind,
    /// The file, when the item is a file and could be materialized.
    pub file: Option<FileHandle>,
}

impl ClipboardItem {
    /// Creates a file item.
    pub fn file(file: FileHandle) -> Self {
        Self {
            kind: ClipboardItemKind::File,
            file: Some(file),
        }
    }

    /// Creates a string item.
    pub fn text() -> Self {
        Self {
            kind: ClipboardItemKind::String,
            file: None,
        }
    }
}

/// The input channel a batch of files arrived through.
#[derive(Clone, Debug)]
pub enum SelectionSource {
    /// The file-picker dialog was confirmed (or cancelled, with no files).
    Dialog(Vec<FileHandle>),
    /// Files were dropped on the drop zone.
    Drop(Vec<FileHandle>),
    /// The clipboard was pasted into the page.
    Paste(Vec<ClipboardItem>),
}

impl SelectionSource {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            SelectionSource::Dialog(_) => "dialog",
            SelectionSource::Drop(_) => "drop",
            SelectionSource::Paste(_) => "paste",
        }
    }
}

/// Ordered list of staged files.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    files: Vec<FileHandle>,
}

impl Selection {
    /// Creates a selection from files, keeping their order.
    pub fn new(files: Vec<FileHandle>) -> Self {
        Self { files }
    }

    /// Staged files in selection order.
    pub fn files(&self) -> &[FileHandle] {
        &self.files
    }

    /// Number of staged files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true when nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Sum of all file sizes in bytes.
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(FileHandle::size).sum()
    }

    /// Summary shown in the file info line, `None` when empty.
    pub fn summary(&self) -> Option<SelectionSummary> {
        let first = self.files.first()?;
        Some(SelectionSummary {
            count: self.files.len(),
            total_kb: round_kb(self.total_size()),
            first_name: first.name().to_string(),
        })
    }
}

/// Rounds a byte count to whole kilobytes, half rounding up.
pub fn round_kb(bytes: u64) -> u64 {
    bytes / 1024 + u64::from(bytes % 1024 >= 512)
}

/// Count and aggregate size of a selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectionSummary {
    /// Number of files.
    pub count: usize,
    /// Total size in whole kilobytes.
    pub total_kb: u64,
    /// Name of the first file, shown when only one is staged.
    pub first_name: String,
}

impl fmt::Display for SelectionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 1 {
            write!(f, "{} ({} KB)", self.first_name, self.total_kb)
        } else {
            write!(f, "{} files ({} KB)", self.count, self.total_kb)
        }
    }
}

/// Phase of the current upload attempt.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TransferState {
    /// No upload has run, or a new attempt is about to start.
    #[default]
    Idle,
    /// Request in flight.
    InProgress {
        /// Last reported percentage, 0..=100.
        percent: u8,
    },
    /// Server accepted the upload.
    Succeeded {
        /// Where the browser navigates next.
        redirect_url: String,
    },
    /// Server rejected the upload or the request never completed.
    Failed {
        /// HTTP status, `0` when no response was received.
        status: u16,
    },
}

impl TransferState {
    /// Returns true while a request is in flight.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, TransferState::InProgress { .. })
    }

    /// Returns true for the succeeded and failed states.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Succeeded { .. } | TransferState::Failed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_kb() {
        assert_eq!(round_kb(0), 0);
        assert_eq!(round_kb(511), 0);
        assert_eq!(round_kb(512), 1);
        assert_eq!(round_kb(1024), 1);
        assert_eq!(round_kb(1535), 1);
        assert_eq!(round_kb(1536), 2);
        assert_eq!(round_kb(10 * 1024 * 1024), 10240);
    }

    #[test]
    fn test_summary_single_file() {
        let selection = Selection::new(vec![FileHandle::from_bytes("scan.png", vec![0u8; 2048])]);
        let summary = selection.summary().unwrap();

        assert_eq!(summary.count, 1);
        assert_eq!(summary.total_kb, 2);
        assert_eq!(summary.to_string(), "scan.png (2 KB)");
    }

    #[test]
    fn test_summary_multiple_files() {
        let selection = Selection::new(vec![
            FileHandle::from_bytes("a.png", vec![0u8; 1000]),
            FileHandle::from_bytes("b.png", vec![0u8; 1000]),
            FileHandle::from_bytes("c.png", vec![0u8; 1000]),
        ]);
        let summary = selection.summary().unwrap();

        assert_eq!(selection.total_size(), 3000);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.total_kb, 3);
        assert_eq!(summary.to_string(), "3 files (3 KB)");
    }

    #[test]
    fn test_empty_selection_has_no_summary() {
        let selection = Selection::default();
        assert!(selection.is_empty());
        assert!(selection.summary().is_none());
    }

    #[test]
    fn test_transfer_state_flags() {
        assert!(!TransferState::Idle.is_terminal());
        assert!(TransferState::InProgress { percent: 10 }.is_in_progress());
        assert!(TransferState::Failed { status: 500 }.is_terminal());
        assert!(TransferState::Succeeded {
            redirect_url: "/job/1".to_string()
        }
        .is_terminal());
    }

    #[test]
    fn test_clipboard_item_constructors() {
        let item = ClipboardItem::file(FileHandle::from_bytes("clip.png", vec![1u8, 2, 3]));
        assert_eq!(item.kind, ClipboardItemKind::File);
        assert_eq!(item.file.unwrap().size(), 3);

        let item = ClipboardItem::text();
        assert_eq!(item.kind, ClipboardItemKind::String);
        assert!(item.file.is_none());
    }
}
