//! The page surface the controller drives.
//!
//! [`UploadView`] is the boundary between the controller and whatever shows
//! the widget: the DOM in the browser build, or [`HeadlessView`] everywhere
//! else.

use crate::types::SelectionSummary;
use serde::Serialize;

/// What the progress bar shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "percent", rename_all = "snake_case")]
pub enum ProgressDisplay {
    /// Known total: bar width and readout at this percentage.
    Percent(u8),
    /// Unknown total: bar drawn full, readout left alone.
    Indeterminate,
}

/// Operations the controller performs on the page.
pub trait UploadView {
    /// Shows the file info line with the selection summary.
    fn show_file_info(&mut self, summary: &SelectionSummary);

    /// Hides the file info line.
    fn hide_file_info(&mut self);

    /// Enables or disables the submit control.
    fn set_submit_enabled(&mut self, enabled: bool);

    /// Reveals the progress indicator.
    fn show_progress(&mut self);

    /// Updates the progress indicator.
    fn set_progress(&mut self, progress: ProgressDisplay);

    /// Shows the status line with `text`.
    fn show_status(&mut self, text: &str);

    /// Hides the status line.
    fn hide_status(&mut self);

    /// Shows the inline error with `text`.
    fn show_error(&mut self, text: &str);

    /// Hides the inline error.
    fn hide_error(&mut self);

    /// Navigates away from the page.
    fn navigate(&mut self, url: &str);

    /// Toggles the drop zone highlight.
    fn set_drop_highlight(&mut self, active: bool);

    /// Opens the file picker dialog.
    fn open_file_picker(&mut self);
}

/// Snapshot of everything the widget shows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ViewState {
    /// File info text, `None` while hidden.
    pub file_info: Option<String>,
    /// Whether the submit control is enabled.
    pub submit_enabled: bool,
    /// Whether the progress indicator is visible.
    pub progress_visible: bool,
    /// Bar fill width in percent.
    pub progress_width: u8,
    /// Numeric readout, e.g. `"42%"`.
    pub progress_text: String,
    /// Status line text, `None` while hidden.
    pub status: Option<String>,
    /// Inline error text, `None` while hidden.
    pub error: Option<String>,
    /// Last navigation target.
    pub navigated_to: Option<String>,
    /// Whether the drop zone is highlighted.
    pub drop_highlight: bool,
    /// How many times the file picker was opened.
    pub picker_opened: usize,
}

/// View that keeps its state in memory.
#[derive(Clone, Debug, Default)]
pub struct HeadlessView {
    state: ViewState,
}

impl HeadlessView {
    /// Creates a view with nothing shown and submit disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot.
    pub fn state(&self) -> &ViewState {
        &self.state
    }
}

impl UploadView for HeadlessView {
    fn show_file_info(&mut self, summary: &SelectionSummary) {
        self.state.file_info = Some(summary.to_string());
    }

    fn hide_file_info(&mut self) {
        self.state.file_info = None;
    }

    fn set_submit_enabled(&mut self, enabled: bool) {
        self.state.submit_enabled = enabled;
    }

    fn show_progress(&mut self) {
        self.state.progress_visible = true;
    }

    fn set_progress(&mut self, progress: ProgressDisplay) {
        match progress {
            ProgressDisplay::Percent(percent) => {
                self.state.progress_width = percent;
                self.state.progress_text = format!("{}%", percent);
            }
            ProgressDisplay::Indeterminate => self.state.progress_width = 100,
        }
    }

    fn show_status(&mut self, text: &str) {
        self.state.status = Some(text.to_string());
    }

    fn hide_status(&mut self) {
        self.state.status = None;
    }

    fn show_error(&mut self, text: &str) {
        self.state.error = Some(text.to_string());
    }

    fn hide_error(&mut self) {
        self.state.error = None;
    }

    fn navigate(&mut self, url: &str) {
        self.state.navigated_to = Some(url.to_string());
    }

    fn set_drop_highlight(&mut self, active: bool) {
        self.state.drop_highlight = active;
    }

    fn open_file_picker(&mut self) {
        self.state.picker_opened += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_display() {
        let mut view = HeadlessView::new();
        view.set_progress(ProgressDisplay::Percent(42));
        assert_eq!(view.state().progress_width, 42);
        assert_eq!(view.state().progress_text, "42%");

        view.set_progress(ProgressDisplay::Indeterminate);
        assert_eq!(view.state().progress_width, 100);
        assert_eq!(view.state().progress_text, "42%");
    }

    #[test]
    fn test_file_info() {
        let mut view = HeadlessView::new();
        view.show_file_info(&SelectionSummary {
            count: 2,
            total_kb: 5,
            first_name: "a.png".to_string(),
        });
        assert_eq!(view.state().file_info.as_deref(), Some("2 files (5 KB)"));

        view.hide_file_info();
        assert!(view.state().file_info.is_none());
    }
}
