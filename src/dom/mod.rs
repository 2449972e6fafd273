//! Browser binding: the page elements as an [`UploadView`] and the event
//! listeners feeding the controller.
//!
//! The page is expected to carry these element ids: `dropZone`, `fileInput`,
//! `browseLink`, `uploadForm`, `uploadBtn`, `fileInfo`, `fileName`,
//! `progressWrapper`, `progressFill`, `progressPercent`, `statusText`,
//! `errorBox` and `errorMessage`. Visibility is toggled with the `hidden`
//! class, the drop zone highlight with `drag-over`.

mod xhr;

pub use xhr::XhrTransport;

use crate::config::UploadConfig;
use crate::controller::UploadController;
use crate::errors::UploadError;
use crate::transport::UploadTransport;
use crate::types::{ClipboardItem, ClipboardItemKind, FileHandle, SelectionSource, SelectionSummary};
use crate::view::{ProgressDisplay, UploadView};
use futures::StreamExt;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    ClipboardEvent, Document, DragEvent, Element, Event, EventTarget, FileList,
    HtmlButtonElement, HtmlElement, HtmlInputElement, Window,
};

const HIDDEN: &str = "hidden";
const DRAG_OVER: &str = "drag-over";

type DomController = UploadController<DomView>;

/// The widget's page elements.
pub struct DomView {
    window: Window,
    drop_zone: Element,
    file_input: HtmlInputElement,
    upload_btn: HtmlButtonElement,
    file_info: Element,
    file_name: Element,
    progress_wrapper: Element,
    progress_fill: HtmlElement,
    progress_percent: Element,
    status_text: Element,
    error_box: Element,
    error_message: Element,
}

fn element<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("missing element #{}", id)))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("unexpected element type for #{}", id)))
}

fn set_hidden(el: &Element, hidden: bool) {
    let classes = el.class_list();
    let result = if hidden {
        classes.add_1(HIDDEN)
    } else {
        classes.remove_1(HIDDEN)
    };
    if let Err(e) = result {
        warn!(id = %el.id(), error = ?e, "Failed to toggle visibility");
    }
}

impl DomView {
    /// Looks up every widget element in the document.
    pub fn from_document(document: &Document, window: Window) -> Result<Self, JsValue> {
        Ok(Self {
            window,
            drop_zone: element(document, "dropZone")?,
            file_input: element(document, "fileInput")?,
            upload_btn: element(document, "uploadBtn")?,
            file_info: element(document, "fileInfo")?,
            file_name: element(document, "fileName")?,
            progress_wrapper: element(document, "progressWrapper")?,
            progress_fill: element(document, "progressFill")?,
            progress_percent: element(document, "progressPercent")?,
            status_text: element(document, "statusText")?,
            error_box: element(document, "errorBox")?,
            error_message: element(document, "errorMessage")?,
        })
    }

    fn set_fill_width(&self, percent: u8) {
        if let Err(e) = self
            .progress_fill
            .style()
            .set_property("width", &format!("{}%", percent))
        {
            warn!(error = ?e, "Failed to update progress bar");
        }
    }
}

impl UploadView for DomView {
    fn show_file_info(&mut self, summary: &SelectionSummary) {
        self.file_name.set_text_content(Some(&summary.to_string()));
        set_hidden(&self.file_info, false);
    }

    fn hide_file_info(&mut self) {
        set_hidden(&self.file_info, true);
    }

    fn set_submit_enabled(&mut self, enabled: bool) {
        self.upload_btn.set_disabled(!enabled);
    }

    fn show_progress(&mut self) {
        set_hidden(&self.progress_wrapper, false);
    }

    fn set_progress(&mut self, progress: ProgressDisplay) {
        match progress {
            ProgressDisplay::Percent(percent) => {
                self.set_fill_width(percent);
                self.progress_percent
                    .set_text_content(Some(&format!("{}%", percent)));
            }
            ProgressDisplay::Indeterminate => self.set_fill_width(100),
        }
    }

    fn show_status(&mut self, text: &str) {
        self.status_text.set_text_content(Some(text));
        set_hidden(&self.status_text, false);
    }

    fn hide_status(&mut self) {
        set_hidden(&self.status_text, true);
    }

    fn show_error(&mut self, text: &str) {
        self.error_message.set_text_content(Some(text));
        set_hidden(&self.error_box, false);
    }

    fn hide_error(&mut self) {
        set_hidden(&self.error_box, true);
    }

    fn navigate(&mut self, url: &str) {
        if let Err(e) = self.window.location().set_href(url) {
            warn!(url, error = ?e, "Navigation failed");
        }
    }

    fn set_drop_highlight(&mut self, active: bool) {
        let classes = self.drop_zone.class_list();
        let result = if active {
            classes.add_1(DRAG_OVER)
        } else {
            classes.remove_1(DRAG_OVER)
        };
        if let Err(e) = result {
            warn!(error = ?e, "Failed to toggle drop highlight");
        }
    }

    fn open_file_picker(&mut self) {
        self.file_input.click();
    }
}

fn listen<F>(target: &EventTarget, event: &str, handler: F) -> Result<(), JsValue>
where
    F: FnMut(Event) + 'static,
{
    let closure = Closure::<dyn FnMut(Event)>::new(handler);
    target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    closure.forget(); // listeners live as long as the page
    Ok(())
}

fn file_handles(files: Option<FileList>) -> Vec<FileHandle> {
    let Some(files) = files else {
        return Vec::new();
    };
    (0..files.length())
        .filter_map(|i| files.get(i))
        .map(FileHandle::from_web_file)
        .collect()
}

fn clipboard_items(event: &ClipboardEvent) -> Vec<ClipboardItem> {
    let Some(items) = event.clipboard_data().map(|data| data.items()) else {
        return Vec::new();
    };
    (0..items.length())
        .filter_map(|i| items.get(i))
        .map(|item| {
            if item.kind() == "file" {
                ClipboardItem {
                    kind: ClipboardItemKind::File,
                    file: item.get_as_file().ok().flatten().map(FileHandle::from_web_file),
                }
            } else {
                ClipboardItem::text()
            }
        })
        .collect()
}

fn submit(controller: &Rc<RefCell<DomController>>, transport: &Arc<XhrTransport>) {
    let Some(request) = controller.borrow_mut().begin_submit() else {
        return;
    };

    let controller = Rc::clone(controller);
    let transport = Arc::clone(transport);
    wasm_bindgen_futures::spawn_local(async move {
        let mut events = match transport.send(request).await {
            Ok(events) => events,
            Err(e) => {
                controller.borrow_mut().fail(e);
                return;
            }
        };

        while let Some(event) = events.next().await {
            if controller.borrow_mut().handle_event(event) {
                return;
            }
        }

        controller.borrow_mut().fail(
            UploadError::Interrupted("event stream ended without a response".to_string()).into(),
        );
    });
}

/// Wires the upload widget into the current page.
///
/// `multiple` selects the multi-file variant; with `false` only the first
/// file of each selection is staged.
#[wasm_bindgen]
pub fn mount(multiple: bool) -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let config = UploadConfig::builder()
        .base_url(window.location().origin()?)
        .multiple(multiple)
        .build()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let view = DomView::from_document(&document, window.clone())?;
    let drop_zone: EventTarget = view.drop_zone.clone().into();
    let file_input = view.file_input.clone();

    let transport = Arc::new(XhrTransport::new());
    let controller = UploadController::new(config, transport.clone(), view)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    let controller = Rc::new(RefCell::new(controller));

    {
        let controller = controller.clone();
        let browse_link: HtmlElement = element(&document, "browseLink")?;
        listen(&browse_link, "click", move |event| {
            event.prevent_default();
            controller.borrow_mut().browse();
        })?;
    }

    {
        let controller = controller.clone();
        let input = file_input.clone();
        listen(&file_input, "change", move |_event| {
            let files = file_handles(input.files());
            // reset so picking the same file again fires `change`
            input.set_value("");
            controller
                .borrow_mut()
                .select_files(SelectionSource::Dialog(files));
        })?;
    }

    for name in ["dragenter", "dragover"] {
        let controller = controller.clone();
        listen(&drop_zone, name, move |event| {
            event.prevent_default();
            event.stop_propagation();
            let mut controller = controller.borrow_mut();
            if event.type_() == "dragenter" {
                controller.drag_enter();
            } else {
                controller.drag_over();
            }
        })?;
    }

    {
        let controller = controller.clone();
        listen(&drop_zone, "dragleave", move |event| {
            event.prevent_default();
            event.stop_propagation();
            controller.borrow_mut().drag_leave();
        })?;
    }

    {
        let controller = controller.clone();
        listen(&drop_zone, "drop", move |event| {
            event.prevent_default();
            event.stop_propagation();
            let files = event
                .dyn_ref::<DragEvent>()
                .and_then(|drag| drag.data_transfer())
                .map(|transfer| file_handles(transfer.files()))
                .unwrap_or_default();
            controller
                .borrow_mut()
                .select_files(SelectionSource::Drop(files));
        })?;
    }

    {
        let controller = controller.clone();
        let transport = transport.clone();
        let form: HtmlElement = element(&document, "uploadForm")?;
        listen(&form, "submit", move |event| {
            event.prevent_default();
            submit(&controller, &transport);
        })?;
    }

    {
        let controller = controller.clone();
        listen(&window, "paste", move |event| {
            let Some(event) = event.dyn_ref::<ClipboardEvent>() else {
                return;
            };
            let items = clipboard_items(event);
            controller
                .borrow_mut()
                .select_files(SelectionSource::Paste(items));
        })?;
    }

    Ok(())
}
