//! Mock transport for testing.

use crate::errors::{TransportError, UploadWidgetResult};
use crate::transport::{UploadEvent, UploadEvents, UploadRequest, UploadTransport};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One part of a recorded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPart {
    /// Form field name.
    pub field_name: String,
    /// File name.
    pub file_name: String,
    /// File size in bytes.
    pub size: u64,
}

/// A recorded request for verification.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request URL.
    pub url: String,
    /// Parts in send order.
    pub parts: Vec<RecordedPart>,
    /// Announced body length.
    pub content_length: u64,
}

/// Scripted outcome of one upload.
#[derive(Debug)]
pub enum MockScript {
    /// Emit these events in order.
    Events(Vec<UploadEvent>),
    /// Refuse to start the request.
    Refuse(TransportError),
}

impl MockScript {
    /// Progress in `steps` even increments, then a completion.
    pub fn progress_then_complete(steps: u64, status: u16, location: Option<&str>) -> Self {
        let total = steps * 100;
        let mut events: Vec<UploadEvent> = (1..=steps)
            .map(|i| UploadEvent::Progress {
                loaded: i * 100,
                total: Some(total),
            })
            .collect();
        events.push(UploadEvent::Complete {
            status,
            location: location.map(str::to_string),
        });
        MockScript::Events(events)
    }

    /// A bare completion.
    pub fn complete(status: u16, location: Option<&str>) -> Self {
        MockScript::Events(vec![UploadEvent::Complete {
            status,
            location: location.map(str::to_string),
        }])
    }
}

/// Mock transport for testing.
///
/// Scripts are consumed one per request; once the queue is empty every
/// request completes with status 200 and no location.
pub struct MockTransport {
    scripts: Arc<Mutex<VecDeque<MockScript>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Creates a mock transport with queued scripts.
    pub fn with_scripts(scripts: Vec<MockScript>) -> Self {
        let transport = Self::new();
        for script in scripts {
            transport.enqueue(script);
        }
        transport
    }

    /// Adds a script to the queue.
    pub fn enqueue(&self, script: MockScript) {
        self.scripts.lock().unwrap().push_back(script);
    }

    /// Gets all recorded requests.
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Gets the last recorded request.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    /// Returns the number of requests made.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn record_request(&self, request: &UploadRequest) {
        let parts = request
            .form
            .parts()
            .iter()
            .map(|part| RecordedPart {
                field_name: part.field_name().to_string(),
                file_name: part.file_name().to_string(),
                size: part.file().size(),
            })
            .collect();

        self.requests.lock().unwrap().push(RecordedRequest {
            url: request.url.to_string(),
            parts,
            content_length: request.form.content_length(),
        });
    }

    fn next_script(&self) -> MockScript {
        self.scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| MockScript::complete(200, None))
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl UploadTransport for MockTransport {
    async fn send(&self, request: UploadRequest) -> UploadWidgetResult<UploadEvents> {
        self.record_request(&request);

        match self.next_script() {
            MockScript::Events(events) => Ok(UploadEvents::new(futures::stream::iter(events))),
            MockScript::Refuse(error) => Err(error.into()),
        }
    }
}
