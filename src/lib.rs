//! Upload Widget
//!
//! Client-side file upload widget: files are collected from a file-picker
//! dialog, drag-and-drop or a clipboard paste, staged in memory, and sent in
//! a single progress-tracked `multipart/form-data` POST. When the server
//! accepts the upload the widget navigates to the location it returned.
//!
//! # Features
//!
//! - **Selection**: dialog, drop and paste channels; each event replaces the
//!   staged files wholesale
//! - **Progress**: percentage updates when the body size is known, a full bar
//!   when it is not
//! - **Transports**: reqwest on native targets, `XMLHttpRequest` in the browser,
//!   a scripted mock for tests
//! - **Browser binding**: `mount()` wires the controller to the page (wasm32 only)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use upload_widget::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = UploadConfig::builder()
//!     .base_url("http://localhost:8080")
//!     .build()?;
//! let transport = Arc::new(HttpTransport::new(&config)?);
//! let mut controller = UploadController::new(config, transport, HeadlessView::new())?;
//!
//! let file = FileHandle::open("scan.png").await?;
//! controller.select_files(SelectionSource::Dialog(vec![file]));
//!
//! match controller.submit().await {
//!     TransferState::Succeeded { redirect_url } => println!("job at {}", redirect_url),
//!     other => println!("upload ended as {:?}", other),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

// Core modules
pub mod config;
pub mod controller;
pub mod errors;
pub mod mocks;
pub mod multipart;
pub mod transport;
pub mod types;
pub mod view;

// Browser binding
#[cfg(target_arch = "wasm32")]
pub mod dom;

// Re-exports for convenience
pub use config::{Messages, UploadConfig, UploadConfigBuilder};
pub use controller::UploadController;
pub use errors::{UploadWidgetError, UploadWidgetResult};
pub use types::{FileHandle, Selection, SelectionSource, TransferState};

/// Prelude module with commonly used types and traits.
///
/// ```no_run
/// use upload_widget::prelude::*;
/// ```
pub mod prelude {
    // Controller
    pub use crate::controller::UploadController;

    // Configuration
    pub use crate::config::{Messages, UploadConfig, UploadConfigBuilder};

    // Selection and state
    pub use crate::types::{
        ClipboardItem, ClipboardItemKind, FileContent, FileHandle, Selection, SelectionSource,
        SelectionSummary, TransferState,
    };

    // View
    pub use crate::view::{HeadlessView, ProgressDisplay, UploadView, ViewState};

    // Transport
    pub use crate::transport::{UploadEvent, UploadEvents, UploadRequest, UploadTransport};

    #[cfg(not(target_arch = "wasm32"))]
    pub use crate::transport::HttpTransport;

    #[cfg(target_arch = "wasm32")]
    pub use crate::dom::{DomView, XhrTransport};

    // Errors
    pub use crate::errors::{UploadWidgetError, UploadWidgetResult};
}
