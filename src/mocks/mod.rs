//! Mock implementations for testing.
//!
//! This module provides a scripted transport so controller behavior can be
//! exercised without a network stack.

mod transport;

pub use transport::{MockScript, MockTransport, RecordedPart, RecordedRequest};

use crate::types::FileHandle;

/// Test fixtures for upload scenarios.
pub struct TestFixtures;

impl TestFixtures {
    /// A file of `size` zero bytes.
    pub fn file(name: &str, size: usize) -> FileHandle {
        FileHandle::from_bytes(name.to_string(), vec![0u8; size])
    }

    /// Three image files of 1000, 2000 and 3000 bytes.
    pub fn images() -> Vec<FileHandle> {
        vec![
            Self::file("page-1.png", 1000),
            Self::file("page-2.jpg", 2000),
            Self::file("page-3.png", 3000),
        ]
    }
}
