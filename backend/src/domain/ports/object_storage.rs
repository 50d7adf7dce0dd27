//! Port for storing uploaded room images.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by object storage adapters.
    pub enum ObjectStorageError {
        /// The upload was refused before storage was touched.
        Invalid { message: String } =>
            "object rejected: {message}",
        /// Writing the object failed.
        Write { message: String } =>
            "object storage write failed: {message}",
    }
}

/// Port for uploading binary objects.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store the bytes and return their public URL.
    async fn upload(&self, bytes: Vec<u8>, content_type: &str)
    -> Result<String, ObjectStorageError>;
}

/// Fixture storage returning a deterministic URL per upload size.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureObjectStorage;

#[async_trait]
impl ObjectStorage for FixtureObjectStorage {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ObjectStorageError> {
        if !content_type.starts_with("image/") {
            return Err(ObjectStorageError::invalid(format!(
                "unsupported content type {content_type}"
            )));
        }
        Ok(format!("/media/fixture-{}.img", bytes.len()))
    }
}
