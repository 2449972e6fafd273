//! Upload transport layer.
//!
//! A transport takes one [`UploadRequest`] and answers with a stream of
//! [`UploadEvent`]s: zero or more progress events followed by exactly one
//! terminal event.

use crate::errors::{TransportError, UploadWidgetResult};
use crate::multipart::MultipartForm;
use async_trait::async_trait;
use bytes::Bytes;
use futures::channel::mpsc;
use futures::stream::Stream;
use pin_project::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use url::Url;

#[cfg(not(target_arch = "wasm32"))]
mod http_transport;
#[cfg(not(target_arch = "wasm32"))]
pub use http_transport::HttpTransport;

/// Upload transport abstraction for testability.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait UploadTransport: Send + Sync {
    /// Starts the upload and returns its event stream.
    ///
    /// Errors returned here mean the request was never issued.
    async fn send(&self, request: UploadRequest) -> UploadWidgetResult<UploadEvents>;
}

/// A single multipart POST.
#[derive(Debug)]
pub struct UploadRequest {
    /// Endpoint URL.
    pub url: Url,
    /// Multipart form carrying the staged files.
    pub form: MultipartForm,
    /// Body chunk size; bounds the distance between progress events.
    pub chunk_size: usize,
}

/// Event reported by a running upload.
#[derive(Debug)]
pub enum UploadEvent {
    /// Bytes handed to the network so far.
    Progress {
        /// Bytes sent.
        loaded: u64,
        /// Total body size, when known.
        total: Option<u64>,
    },
    /// The server answered. Terminal.
    Complete {
        /// HTTP status code.
        status: u16,
        /// Location the server pointed the client to, if any.
        location: Option<String>,
    },
    /// The request failed without a response. Terminal.
    Error(TransportError),
}

impl UploadEvent {
    /// Returns true for events that end the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, UploadEvent::Progress { .. })
    }
}

/// Stream of upload events.
#[pin_project]
pub struct UploadEvents {
    #[pin]
    inner: Pin<Box<dyn Stream<Item = UploadEvent> + Send>>,
}

impl UploadEvents {
    /// Wraps an event stream.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = UploadEvent> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// Creates a channel-backed event stream and its sending half.
    pub fn channel() -> (UploadEventSender, Self) {
        let (tx, rx) = mpsc::unbounded();
        (UploadEventSender { tx }, Self::new(rx))
    }
}

impl Stream for UploadEvents {
    type Item = UploadEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        this.inner.poll_next(cx)
    }
}

impl std::fmt::Debug for UploadEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UploadEvents")
    }
}

/// Sending half of a channel-backed [`UploadEvents`] stream.
///
/// Sends after the receiver is gone are dropped silently.
#[derive(Clone, Debug)]
pub struct UploadEventSender {
    tx: mpsc::UnboundedSender<UploadEvent>,
}

impl UploadEventSender {
    /// Reports transfer progress.
    pub fn progress(&self, loaded: u64, total: Option<u64>) {
        let _ = self.tx.unbounded_send(UploadEvent::Progress { loaded, total });
    }

    /// Reports the server's answer and closes the stream.
    pub fn complete(&self, status: u16, location: Option<String>) {
        let _ = self.tx.unbounded_send(UploadEvent::Complete { status, location });
        self.tx.close_channel();
    }

    /// Reports a failed request and closes the stream.
    pub fn fail(&self, error: TransportError) {
        let _ = self.tx.unbounded_send(UploadEvent::Error(error));
        self.tx.close_channel();
    }
}

/// Body stream wrapper reporting cumulative bytes as chunks are consumed.
#[pin_project]
pub struct ProgressStream<S> {
    #[pin]
    inner: S,
    sent: u64,
    total: Option<u64>,
    events: UploadEventSender,
}

impl<S> ProgressStream<S> {
    /// Wraps a body stream.
    pub fn new(inner: S, total: Option<u64>, events: UploadEventSender) -> Self {
        Self {
            inner,
            sent: 0,
            total,
            events,
        }
    }
}

impl<S, E> Stream for ProgressStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    type Item = Result<Bytes, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let polled = this.inner.poll_next(cx);
        if let Poll::Ready(Some(Ok(chunk))) = &polled {
            *this.sent += chunk.len() as u64;
            this.events.progress(*this.sent, *this.total);
        }
        polled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::stream::{self, StreamExt};

    #[test]
    fn test_channel_closes_after_complete() {
        let (sender, events) = UploadEvents::channel();
        sender.progress(10, Some(100));
        sender.complete(303, Some("/job/1".to_string()));
        sender.progress(20, Some(100));

        let collected: Vec<UploadEvent> = block_on(events.collect());
        assert_eq!(collected.len(), 2);
        assert!(!collected[0].is_terminal());
        assert!(matches!(
            &collected[1],
            UploadEvent::Complete { status: 303, location: Some(l) } if l == "/job/1"
        ));
    }

    #[test]
    fn test_progress_stream_counts_bytes() {
        let (sender, events) = UploadEvents::channel();
        let body = stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"abcd")),
            Ok(Bytes::from_static(b"ef")),
        ]);
        let progress = ProgressStream::new(body, Some(6), sender.clone());

        let chunks: Vec<_> = block_on(progress.collect());
        assert_eq!(chunks.len(), 2);
        sender.complete(200, None);

        let collected: Vec<UploadEvent> = block_on(events.collect());
        let loaded: Vec<u64> = collected
            .iter()
            .filter_map(|e| match e {
                UploadEvent::Progress { loaded, total } => {
                    assert_eq!(*total, Some(6));
                    Some(*loaded)
                }
                _ => None,
            })
            .collect();
        assert_eq!(loaded, vec![4, 6]);
    }
}
