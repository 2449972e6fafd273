//! Upload controller: selection staging and the submit state machine.

use crate::config::UploadConfig;
use crate::errors::{UploadError, UploadWidgetError, UploadWidgetResult};
use crate::multipart::MultipartForm;
use crate::transport::{UploadEvent, UploadRequest, UploadTransport};
use crate::types::{ClipboardItemKind, FileHandle, Selection, SelectionSource, TransferState};
use crate::view::{ProgressDisplay, UploadView};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owns the selection and transfer state and drives the view.
///
/// All state transitions are methods; the browser binding calls the
/// step API ([`begin_submit`](Self::begin_submit),
/// [`handle_event`](Self::handle_event), [`fail`](Self::fail)) from its
/// callbacks, native callers use [`submit`](Self::submit).
pub struct UploadController<V: UploadView> {
    config: UploadConfig,
    transport: Arc<dyn UploadTransport>,
    view: V,
    selection: Selection,
    transfer: TransferState,
    drop_highlight: bool,
}

impl<V: UploadView> UploadController<V> {
    /// Creates a controller and renders the empty selection.
    pub fn new(
        config: UploadConfig,
        transport: Arc<dyn UploadTransport>,
        view: V,
    ) -> UploadWidgetResult<Self> {
        config.validate()?;

        let mut controller = Self {
            config,
            transport,
            view,
            selection: Selection::default(),
            transfer: TransferState::Idle,
            drop_highlight: false,
        };
        controller.render_selection();
        Ok(controller)
    }

    /// Staged files.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Current transfer state.
    pub fn transfer_state(&self) -> &TransferState {
        &self.transfer
    }

    /// Whether the drop zone is highlighted.
    pub fn is_drop_highlighted(&self) -> bool {
        self.drop_highlight
    }

    /// The view.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// Configuration.
    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Opens the file picker.
    pub fn browse(&mut self) {
        self.view.open_file_picker();
    }

    /// A drag entered the drop zone.
    pub fn drag_enter(&mut self) {
        self.set_drop_highlight(true);
    }

    /// A drag moved over the drop zone.
    pub fn drag_over(&mut self) {
        self.set_drop_highlight(true);
    }

    /// A drag left the drop zone.
    pub fn drag_leave(&mut self) {
        self.set_drop_highlight(false);
    }

    fn set_drop_highlight(&mut self, active: bool) {
        if self.drop_highlight != active {
            self.drop_highlight = active;
            self.view.set_drop_highlight(active);
        }
    }

    /// Stages the files carried by a selection event.
    ///
    /// Dialog results always replace the selection, so a cancelled dialog
    /// clears it. Drops and pastes without files leave it untouched.
    pub fn select_files(&mut self, source: SelectionSource) {
        let label = source.label();
        let files: Vec<FileHandle> = match source {
            SelectionSource::Dialog(files) => files,
            SelectionSource::Drop(files) => {
                self.set_drop_highlight(false);
                if files.is_empty() {
                    debug!(source = label, "Ignoring selection without files");
                    return;
                }
                files
            }
            SelectionSource::Paste(items) => {
                let files: Vec<FileHandle> = items
                    .into_iter()
                    .filter(|item| item.kind == ClipboardItemKind::File)
                    .filter_map(|item| item.file)
                    .collect();
                if files.is_empty() {
                    debug!(source = label, "Ignoring selection without files");
                    return;
                }
                files
            }
        };

        let files = if self.config.multiple {
            files
        } else {
            files.into_iter().take(1).collect()
        };

        self.selection = Selection::new(files);
        debug!(
            source = label,
            files = self.selection.len(),
            bytes = self.selection.total_size(),
            "Selection replaced"
        );
        self.render_selection();
    }

    fn render_selection(&mut self) {
        match self.selection.summary() {
            Some(summary) => {
                self.view.show_file_info(&summary);
                self.view.set_submit_enabled(!self.transfer.is_in_progress());
            }
            None => {
                self.view.hide_file_info();
                self.view.set_submit_enabled(false);
            }
        }
    }

    /// Uploads the selection and drives the view until the upload ends.
    ///
    /// A no-op when nothing is staged or an upload is already running.
    /// Failures never escape: they end up in [`TransferState::Failed`] and
    /// the inline error.
    pub async fn submit(&mut self) -> &TransferState {
        let Some(request) = self.begin_submit() else {
            return &self.transfer;
        };

        let transport = Arc::clone(&self.transport);
        let mut events = match transport.send(request).await {
            Ok(events) => events,
            Err(e) => {
                self.fail(e);
                return &self.transfer;
            }
        };

        while let Some(event) = events.next().await {
            if self.handle_event(event) {
                return &self.transfer;
            }
        }

        self.fail(
            UploadError::Interrupted("event stream ended without a response".to_string()).into(),
        );
        &self.transfer
    }

    /// Starts a submit attempt: locks the submit control, resets the view
    /// and builds the request.
    ///
    /// Returns `None` when nothing is staged or an upload is in flight.
    pub fn begin_submit(&mut self) -> Option<UploadRequest> {
        if self.selection.is_empty() || self.transfer.is_in_progress() {
            return None;
        }

        let url = match self.config.endpoint() {
            Ok(url) => url,
            Err(e) => {
                self.fail(e);
                return None;
            }
        };

        self.transfer = TransferState::Idle;
        self.view.set_submit_enabled(false);
        self.view.hide_error();
        self.view.show_progress();
        self.view.set_progress(ProgressDisplay::Percent(0));
        self.view.show_status(&self.config.messages.uploading);
        self.transfer = TransferState::InProgress { percent: 0 };

        let form = MultipartForm::new(&self.config.field_name, self.selection.files());
        info!(
            url = %url,
            files = self.selection.len(),
            bytes = self.selection.total_size(),
            "Submitting selection"
        );

        Some(UploadRequest {
            url,
            form,
            chunk_size: self.config.chunk_size,
        })
    }

    /// Applies one transport event. Returns true once the upload is over.
    ///
    /// Events arriving when no upload is in flight are dropped.
    pub fn handle_event(&mut self, event: UploadEvent) -> bool {
        let TransferState::InProgress { percent: current } = self.transfer else {
            debug!(event = ?event, "Dropping event outside of an upload");
            return true;
        };

        match event {
            UploadEvent::Progress {
                loaded,
                total: Some(total),
            } if total > 0 => {
                let percent = percent_of(loaded, total).max(current);
                self.transfer = TransferState::InProgress { percent };
                self.view.set_progress(ProgressDisplay::Percent(percent));
                false
            }
            UploadEvent::Progress { .. } => {
                self.view.set_progress(ProgressDisplay::Indeterminate);
                false
            }
            UploadEvent::Complete { status, location } if (200..400).contains(&status) => {
                let redirect_url =
                    location.unwrap_or_else(|| self.config.fallback_redirect.clone());
                info!(status, redirect = %redirect_url, "Upload accepted");

                self.view.show_status(&self.config.messages.completed);
                self.view.navigate(&redirect_url);
                self.transfer = TransferState::Succeeded { redirect_url };
                true
            }
            UploadEvent::Complete { status, .. } => {
                self.fail(UploadWidgetError::rejected(status));
                true
            }
            UploadEvent::Error(e) => {
                self.fail(e.into());
                true
            }
        }
    }

    /// Ends the current attempt as failed and re-enables submission.
    ///
    /// The selection is kept so the user can retry.
    pub fn fail(&mut self, error: UploadWidgetError) {
        let status = error.status_code();
        warn!(status, error = %error, "Upload failed");

        self.transfer = TransferState::Failed { status };
        self.view.set_submit_enabled(!self.selection.is_empty());
        self.view.hide_status();
        self.view.show_error(&self.config.messages.failure(status));
    }
}

/// `round(loaded / total * 100)`, clamped to 100.
fn percent_of(loaded: u64, total: u64) -> u8 {
    let percent = (loaded as f64 / total as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockTransport;
    use crate::types::ClipboardItem;
    use crate::view::HeadlessView;

    fn controller(transport: Arc<MockTransport>) -> UploadController<HeadlessView> {
        UploadController::new(UploadConfig::default(), transport, HeadlessView::new()).unwrap()
    }

    fn file(name: &str, size: usize) -> FileHandle {
        FileHandle::from_bytes(name, vec![0u8; size])
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(0, 100), 0);
        assert_eq!(percent_of(1, 3), 33);
        assert_eq!(percent_of(2, 3), 67);
        assert_eq!(percent_of(5, 5), 100);
        assert_eq!(percent_of(7, 5), 100);
    }

    #[test]
    fn test_initial_render_disables_submit() {
        let ctrl = controller(Arc::new(MockTransport::new()));
        assert!(!ctrl.view().state().submit_enabled);
        assert!(ctrl.view().state().file_info.is_none());
        assert_eq!(ctrl.transfer_state(), &TransferState::Idle);
    }

    #[test]
    fn test_dialog_replaces_selection() {
        let mut ctrl = controller(Arc::new(MockTransport::new()));
        ctrl.select_files(SelectionSource::Dialog(vec![file("a.png", 10), file("b.png", 20)]));
        ctrl.select_files(SelectionSource::Dialog(vec![file("c.png", 2048)]));

        assert_eq!(ctrl.selection().len(), 1);
        assert_eq!(ctrl.selection().files()[0].name(), "c.png");
        assert_eq!(ctrl.view().state().file_info.as_deref(), Some("c.png (2 KB)"));
        assert!(ctrl.view().state().submit_enabled);
    }

    #[test]
    fn test_cancelled_dialog_clears_selection() {
        let mut ctrl = controller(Arc::new(MockTransport::new()));
        ctrl.select_files(SelectionSource::Dialog(vec![file("a.png", 10)]));
        ctrl.select_files(SelectionSource::Dialog(Vec::new()));

        assert!(ctrl.selection().is_empty());
        assert!(!ctrl.view().state().submit_enabled);
        assert!(ctrl.view().state().file_info.is_none());
    }

    #[test]
    fn test_empty_drop_is_ignored() {
        let mut ctrl = controller(Arc::new(MockTransport::new()));
        ctrl.select_files(SelectionSource::Dialog(vec![file("a.png", 10)]));
        ctrl.drag_enter();
        ctrl.select_files(SelectionSource::Drop(Vec::new()));

        assert_eq!(ctrl.selection().len(), 1);
        assert!(!ctrl.is_drop_highlighted());
    }

    #[test]
    fn test_paste_collects_all_file_items() {
        let mut ctrl = controller(Arc::new(MockTransport::new()));
        ctrl.select_files(SelectionSource::Paste(vec![
            ClipboardItem::text(),
            ClipboardItem::file(file("one.png", 512)),
            ClipboardItem {
                kind: ClipboardItemKind::File,
                file: None,
            },
            ClipboardItem::file(file("two.png", 1024)),
        ]));

        let names: Vec<&str> = ctrl.selection().files().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["one.png", "two.png"]);
        assert_eq!(ctrl.view().state().file_info.as_deref(), Some("2 files (2 KB)"));
    }

    #[test]
    fn test_single_file_variant_keeps_first() {
        let config = UploadConfig::builder().multiple(false).build().unwrap();
        let mut ctrl =
            UploadController::new(config, Arc::new(MockTransport::new()), HeadlessView::new())
                .unwrap();
        ctrl.select_files(SelectionSource::Drop(vec![file("first.png", 1), file("second.png", 1)]));

        assert_eq!(ctrl.selection().len(), 1);
        assert_eq!(ctrl.selection().files()[0].name(), "first.png");
    }

    #[test]
    fn test_drag_highlight() {
        let mut ctrl = controller(Arc::new(MockTransport::new()));
        ctrl.drag_enter();
        ctrl.drag_over();
        assert!(ctrl.view().state().drop_highlight);

        ctrl.drag_leave();
        assert!(!ctrl.view().state().drop_highlight);

        ctrl.drag_over();
        ctrl.select_files(SelectionSource::Drop(vec![file("a.png", 1)]));
        assert!(!ctrl.view().state().drop_highlight);
    }

    #[test]
    fn test_browse_opens_picker() {
        let mut ctrl = controller(Arc::new(MockTransport::new()));
        ctrl.browse();
        assert_eq!(ctrl.view().state().picker_opened, 1);
    }

    #[test]
    fn test_begin_submit_resets_view() {
        let mut ctrl = controller(Arc::new(MockTransport::new()));
        ctrl.select_files(SelectionSource::Dialog(vec![file("a.png", 10)]));
        ctrl.fail(UploadWidgetError::rejected(502));

        let request = ctrl.begin_submit().unwrap();
        let state = ctrl.view().state();

        assert_eq!(request.url.as_str(), "http://localhost:8080/convert");
        assert_eq!(request.form.parts().len(), 1);
        assert!(!state.submit_enabled);
        assert!(state.progress_visible);
        assert_eq!(state.progress_text, "0%");
        assert!(state.error.is_none());
        assert_eq!(state.status.as_deref(), Some("Upload in progress…"));
        assert_eq!(ctrl.transfer_state(), &TransferState::InProgress { percent: 0 });

        // a second submit while in flight is refused
        assert!(ctrl.begin_submit().is_none());
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut ctrl = controller(Arc::new(MockTransport::new()));
        ctrl.select_files(SelectionSource::Dialog(vec![file("a.png", 10)]));
        ctrl.begin_submit().unwrap();

        assert!(!ctrl.handle_event(UploadEvent::Progress { loaded: 60, total: Some(100) }));
        assert!(!ctrl.handle_event(UploadEvent::Progress { loaded: 40, total: Some(100) }));
        assert_eq!(ctrl.transfer_state(), &TransferState::InProgress { percent: 60 });

        assert!(!ctrl.handle_event(UploadEvent::Progress { loaded: 70, total: None }));
        assert_eq!(ctrl.view().state().progress_width, 100);
        assert_eq!(ctrl.view().state().progress_text, "60%");
    }

    #[test]
    fn test_events_after_terminal_are_dropped() {
        let mut ctrl = controller(Arc::new(MockTransport::new()));
        ctrl.select_files(SelectionSource::Dialog(vec![file("a.png", 10)]));
        ctrl.begin_submit().unwrap();

        assert!(ctrl.handle_event(UploadEvent::Complete { status: 500, location: None }));
        assert!(ctrl.handle_event(UploadEvent::Progress { loaded: 1, total: Some(2) }));
        assert_eq!(ctrl.transfer_state(), &TransferState::Failed { status: 500 });
    }
}
