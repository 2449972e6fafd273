//! Reqwest-based upload transport.

use super::{ProgressStream, UploadEventSender, UploadEvents, UploadRequest, UploadTransport};
use crate::config::UploadConfig;
use crate::errors::{SelectionError, TransportError, UploadWidgetResult};
use crate::multipart::MultipartForm;
use crate::types::FileContent;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Body, Client, Response};
use std::io;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};
use url::Url;

const MAX_REDIRECTS: usize = 10;

/// Upload transport backed by a reqwest client.
///
/// The request runs on a spawned tokio task; `send` must be called from
/// within a runtime.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport configured from the upload config.
    pub fn new(config: &UploadConfig) -> UploadWidgetResult<Self> {
        let redirect = if config.follow_redirects {
            Policy::limited(MAX_REDIRECTS)
        } else {
            Policy::none()
        };

        let mut builder = Client::builder()
            .redirect(redirect)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone());

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Http(format!("Failed to create client: {}", e)))?;

        Ok(Self { client })
    }

    /// Creates a transport over an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UploadTransport for HttpTransport {
    async fn send(&self, request: UploadRequest) -> UploadWidgetResult<UploadEvents> {
        verify_file_sizes(&request.form).await?;

        let total = request.form.content_length();
        let (sender, events) = UploadEvents::channel();
        let body = ProgressStream::new(
            body_stream(&request.form, request.chunk_size),
            Some(total),
            sender.clone(),
        );

        info!(
            url = %request.url,
            parts = request.form.parts().len(),
            bytes = total,
            "Starting upload"
        );

        let pending = self
            .client
            .post(request.url.clone())
            .header(CONTENT_TYPE, request.form.content_type_header())
            .header(CONTENT_LENGTH, total)
            .body(Body::wrap_stream(body))
            .send();

        let url = request.url;
        tokio::spawn(async move {
            match pending.await {
                Ok(response) => complete(&url, response, &sender),
                Err(e) => {
                    warn!(error = %e, "Upload request failed");
                    sender.fail(TransportError::from(e));
                }
            }
        });

        Ok(events)
    }
}

fn complete(request_url: &Url, response: Response, sender: &UploadEventSender) {
    let status = response.status().as_u16();
    let location = redirect_location(request_url, &response);

    debug!(status, location = ?location, "Upload finished");
    sender.complete(status, location);
}

/// Where the server sent the client: the final URL after followed redirects,
/// otherwise the `Location` header of an unfollowed redirect.
fn redirect_location(request_url: &Url, response: &Response) -> Option<String> {
    if response.url() != request_url {
        return Some(response.url().to_string());
    }

    let raw = response.headers().get(LOCATION)?.to_str().ok()?;
    Some(
        request_url
            .join(raw)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| raw.to_string()),
    )
}

async fn verify_file_sizes(form: &MultipartForm) -> UploadWidgetResult<()> {
    for part in form.parts() {
        if let FileContent::Path(path) = part.file().content() {
            let metadata = tokio::fs::metadata(path).await.map_err(|e| {
                SelectionError::FileUnreadable(format!("{}: {}", path.display(), e))
            })?;

            if metadata.len() != part.file().size() {
                return Err(SelectionError::SizeChanged {
                    name: part.file_name().to_string(),
                    expected: part.file().size(),
                    actual: metadata.len(),
                }
                .into());
            }
        }
    }
    Ok(())
}

/// Multipart body as a stream: framing interleaved with file content.
fn body_stream(form: &MultipartForm, chunk_size: usize) -> BoxStream<'static, io::Result<Bytes>> {
    let mut segments: Vec<BoxStream<'static, io::Result<Bytes>>> = Vec::new();

    for (index, part) in form.parts().iter().enumerate() {
        segments.push(stream::once(futures::future::ready(Ok(form.part_header(index)))).boxed());
        segments.push(content_stream(part.file().content(), chunk_size));
        segments.push(stream::once(futures::future::ready(Ok(form.part_trailer()))).boxed());
    }
    segments.push(stream::once(futures::future::ready(Ok(form.closing()))).boxed());

    stream::iter(segments).flatten().boxed()
}

fn content_stream(content: &FileContent, chunk_size: usize) -> BoxStream<'static, io::Result<Bytes>> {
    match content {
        FileContent::Bytes(bytes) => stream::iter(split_chunks(bytes, chunk_size).into_iter().map(Ok)).boxed(),
        FileContent::Path(path) => {
            let path = path.clone();
            stream::once(async move { tokio::fs::File::open(path).await })
                .map_ok(move |file| ReaderStream::with_capacity(file, chunk_size))
                .try_flatten()
                .boxed()
        }
    }
}

fn split_chunks(bytes: &Bytes, chunk_size: usize) -> Vec<Bytes> {
    (0..bytes.len())
        .step_by(chunk_size)
        .map(|start| bytes.slice(start..(start + chunk_size).min(bytes.len())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileHandle;

    #[test]
    fn test_split_chunks() {
        let bytes = Bytes::from_static(b"abcdefghij");
        let chunks = split_chunks(&bytes, 4);

        assert_eq!(chunks.len(), 3);
        assert_eq!(&chunks[0][..], b"abcd");
        assert_eq!(&chunks[2][..], b"ij");
        assert!(split_chunks(&Bytes::new(), 4).is_empty());
    }

    #[tokio::test]
    async fn test_body_stream_matches_in_memory_encoding() {
        let files = vec![
            FileHandle::from_bytes("a.png", vec![7u8; 10_000]),
            FileHandle::from_bytes("b.txt", "hello"),
        ];
        let form = MultipartForm::new("file", &files);

        let streamed: Vec<Bytes> = body_stream(&form, 1024).try_collect().await.unwrap();
        let streamed: Vec<u8> = streamed.iter().flat_map(|b| b.iter().copied()).collect();

        assert_eq!(streamed, form.to_bytes().unwrap().to_vec());
        assert_eq!(streamed.len() as u64, form.content_length());
    }

    #[test]
    fn test_transport_from_config() {
        let config = UploadConfig::builder().follow_redirects(false).build().unwrap();
        assert!(HttpTransport::new(&config).is_ok());
    }
}
