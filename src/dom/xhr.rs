//! `XMLHttpRequest` upload transport for the browser build.

use crate::errors::{TransportError, UploadWidgetResult};
use crate::transport::{UploadEvents, UploadRequest, UploadTransport};
use crate::types::FileContent;
use async_trait::async_trait;
use tracing::{info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Blob, BlobPropertyBag, FormData, ProgressEvent, XmlHttpRequest};

/// Upload transport backed by `XMLHttpRequest`.
///
/// The browser follows redirects itself; the final `responseURL` is reported
/// as the location when it differs from the endpoint.
#[derive(Clone, Copy, Debug, Default)]
pub struct XhrTransport;

impl XhrTransport {
    /// Creates a new transport.
    pub fn new() -> Self {
        Self
    }
}

fn js_error(value: JsValue) -> TransportError {
    TransportError::Http(format!("{:?}", value))
}

fn form_data(request: &UploadRequest) -> Result<FormData, JsValue> {
    let form = FormData::new()?;

    for part in request.form.parts() {
        match part.file().content() {
            FileContent::Blob(file) => {
                form.append_with_blob_and_filename(part.field_name(), file, part.file_name())?;
            }
            FileContent::Bytes(bytes) => {
                let array = js_sys::Uint8Array::from(&bytes[..]);
                let options = BlobPropertyBag::new();
                options.set_type(part.content_type().as_ref());
                let blob = Blob::new_with_u8_array_sequence_and_options(
                    &js_sys::Array::of1(&array),
                    &options,
                )?;
                form.append_with_blob_and_filename(part.field_name(), &blob, part.file_name())?;
            }
        }
    }

    Ok(form)
}

#[async_trait(?Send)]
impl UploadTransport for XhrTransport {
    async fn send(&self, request: UploadRequest) -> UploadWidgetResult<UploadEvents> {
        let form = form_data(&request).map_err(js_error)?;
        let xhr = XmlHttpRequest::new().map_err(js_error)?;
        xhr.open_with_async("POST", request.url.as_str(), true)
            .map_err(js_error)?;

        let (sender, events) = UploadEvents::channel();

        let progress_sender = sender.clone();
        let on_progress = Closure::<dyn FnMut(ProgressEvent)>::new(move |event: ProgressEvent| {
            let total = event
                .length_computable()
                .then(|| event.total() as u64);
            progress_sender.progress(event.loaded() as u64, total);
        });
        xhr.upload()
            .map_err(js_error)?
            .set_onprogress(Some(on_progress.as_ref().unchecked_ref()));
        on_progress.forget();

        let endpoint = request.url.to_string();
        let finished = xhr.clone();
        let on_load_end = Closure::<dyn FnMut(ProgressEvent)>::new(move |_event: ProgressEvent| {
            let status = finished.status().unwrap_or(0);
            if status == 0 {
                warn!(url = %endpoint, "Upload request failed");
                sender.fail(TransportError::Network(
                    "request did not reach the server".to_string(),
                ));
                return;
            }

            let response_url = finished.response_url();
            let location = (!response_url.is_empty() && response_url != endpoint)
                .then_some(response_url);
            sender.complete(status, location);
        });
        xhr.set_onloadend(Some(on_load_end.as_ref().unchecked_ref()));
        on_load_end.forget();

        info!(
            url = %request.url,
            parts = request.form.parts().len(),
            "Starting upload"
        );
        xhr.send_with_opt_form_data(Some(&form)).map_err(js_error)?;

        Ok(events)
    }
}
