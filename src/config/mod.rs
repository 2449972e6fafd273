//! Configuration for the upload widget.

use crate::errors::{ConfigurationError, UploadWidgetError, UploadWidgetResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default base URL for native uploads.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Default upload endpoint path.
pub const DEFAULT_UPLOAD_PATH: &str = "/convert";

/// Default multipart field name shared by every file part.
pub const DEFAULT_FIELD_NAME: &str = "file";

/// Default navigation target when the server supplies no location.
pub const DEFAULT_FALLBACK_REDIRECT: &str = "/";

/// Default body chunk size used for progress reporting (64KB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// User-facing texts shown by the widget.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    /// Status line while the upload runs.
    pub uploading: String,

    /// Status line once the server accepted the upload.
    pub completed: String,

    /// Inline error text; `{status}` is replaced with the HTTP status code.
    pub failed: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            uploading: "Upload in progress…".to_string(),
            completed: "Upload complete. Redirecting…".to_string(),
            failed: "Upload failed (status {status}).".to_string(),
        }
    }
}

impl Messages {
    /// Renders the inline error text for a status code.
    pub fn failure(&self, status: u16) -> String {
        self.failed.replace("{status}", &status.to_string())
    }
}

/// Configuration for the upload controller and its transports.
#[derive(Clone, Debug)]
pub struct UploadConfig {
    /// Base URL the upload path is resolved against.
    pub base_url: Url,

    /// Endpoint path receiving the multipart POST.
    pub upload_path: String,

    /// Multipart field name, repeated once per file.
    pub field_name: String,

    /// Navigation target used when the server supplies no location.
    pub fallback_redirect: String,

    /// Whether a selection event may stage more than one file.
    pub multiple: bool,

    /// Whether the transport follows redirects issued by the endpoint.
    pub follow_redirects: bool,

    /// Overall request timeout. Uploads never time out when unset.
    pub timeout: Option<Duration>,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Body chunk size; one progress event is emitted per chunk.
    pub chunk_size: usize,

    /// User agent string.
    pub user_agent: String,

    /// User-facing texts.
    pub messages: Messages,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("Invalid default base URL"),
            upload_path: DEFAULT_UPLOAD_PATH.to_string(),
            field_name: DEFAULT_FIELD_NAME.to_string(),
            fallback_redirect: DEFAULT_FALLBACK_REDIRECT.to_string(),
            multiple: true,
            follow_redirects: true,
            timeout: None,
            connect_timeout: Duration::from_secs(30),
            chunk_size: DEFAULT_CHUNK_SIZE,
            user_agent: format!("upload-widget/{}", env!("CARGO_PKG_VERSION")),
            messages: Messages::default(),
        }
    }
}

impl UploadConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> UploadConfigBuilder {
        UploadConfigBuilder::new()
    }

    /// Returns the absolute endpoint URL.
    pub fn endpoint(&self) -> UploadWidgetResult<Url> {
        self.base_url.join(&self.upload_path).map_err(|e| {
            UploadWidgetError::Configuration(ConfigurationError::InvalidUrl(format!(
                "Cannot resolve {} against {}: {}",
                self.upload_path, self.base_url, e
            )))
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> UploadWidgetResult<()> {
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(UploadWidgetError::Configuration(
                ConfigurationError::InvalidUrl("Base URL must use HTTP or HTTPS".to_string()),
            ));
        }

        if !self.upload_path.starts_with('/') {
            return Err(UploadWidgetError::Configuration(
                ConfigurationError::InvalidUrl(format!(
                    "Upload path must start with '/': {}",
                    self.upload_path
                )),
            ));
        }

        if self.field_name.is_empty()
            || self
                .field_name
                .chars()
                .any(|c| c == '"' || c == '\r' || c == '\n')
        {
            return Err(UploadWidgetError::Configuration(
                ConfigurationError::InvalidFieldName(format!("{:?}", self.field_name)),
            ));
        }

        if self.chunk_size == 0 {
            return Err(UploadWidgetError::Configuration(
                ConfigurationError::InvalidConfiguration(
                    "Chunk size must be greater than zero".to_string(),
                ),
            ));
        }

        Ok(())
    }
}

/// Builder for UploadConfig.
pub struct UploadConfigBuilder {
    base_url: Option<String>,
    config: UploadConfig,
}

impl UploadConfigBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            config: UploadConfig::default(),
        }
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the upload endpoint path.
    pub fn upload_path(mut self, path: impl Into<String>) -> Self {
        self.config.upload_path = path.into();
        self
    }

    /// Sets the multipart field name.
    pub fn field_name(mut self, name: impl Into<String>) -> Self {
        self.config.field_name = name.into();
        self
    }

    /// Sets the fallback navigation target.
    pub fn fallback_redirect(mut self, target: impl Into<String>) -> Self {
        self.config.fallback_redirect = target.into();
        self
    }

    /// Allows or forbids staging more than one file per selection event.
    pub fn multiple(mut self, multiple: bool) -> Self {
        self.config.multiple = multiple;
        self
    }

    /// Sets whether redirects are followed.
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    /// Sets the overall request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Sets the body chunk size used for progress reporting.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Sets the user agent string.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    /// Sets the user-facing texts.
    pub fn messages(mut self, messages: Messages) -> Self {
        self.config.messages = messages;
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> UploadWidgetResult<UploadConfig> {
        let mut config = self.config;

        if let Some(raw) = self.base_url {
            config.base_url = Url::parse(&raw).map_err(|e| {
                UploadWidgetError::Configuration(ConfigurationError::InvalidUrl(format!(
                    "{}: {}",
                    raw, e
                )))
            })?;
        }

        config.validate()?;

        Ok(config)
    }
}

impl Default for UploadConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
