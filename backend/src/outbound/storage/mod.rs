//! Local filesystem object storage for room images.
//!
//! Objects are written under a capability-scoped directory and named by the
//! SHA-256 of their content, so re-uploading the same image is idempotent.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use sha2::{Digest, Sha256};

use crate::domain::ports::{ObjectStorage, ObjectStorageError};

/// Map an accepted image content type to its file extension.
fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type.trim().to_ascii_lowercase().as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Object storage rooted at a local directory and served under `public_base`.
#[derive(Debug, Clone)]
pub struct LocalObjectStorage {
    root: Arc<Dir>,
    public_base: String,
}

impl LocalObjectStorage {
    /// Open (creating if needed) `root` and serve objects under `public_base`.
    pub fn open(root: &Path, public_base: impl Into<String>) -> std::io::Result<Self> {
        Dir::create_ambient_dir_all(root, ambient_authority())?;
        let dir = Dir::open_ambient_dir(root, ambient_authority())?;
        Ok(Self {
            root: Arc::new(dir),
            public_base: public_base.into().trim_end_matches('/').to_owned(),
        })
    }

    /// Content-addressed object name.
    fn object_name(bytes: &[u8], extension: &str) -> String {
        format!("{}.{extension}", hex::encode(Sha256::digest(bytes)))
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ObjectStorageError> {
        let extension = extension_for(content_type).ok_or_else(|| {
            ObjectStorageError::invalid(format!("unsupported image type {content_type}"))
        })?;
        let name = Self::object_name(&bytes, extension);

        let root = Arc::clone(&self.root);
        let file_name = name.clone();
        tokio::task::spawn_blocking(move || root.write(&file_name, &bytes))
            .await
            .map_err(|err| ObjectStorageError::write(err.to_string()))?
            .map_err(|err| ObjectStorageError::write(err.to_string()))?;

        Ok(format!("{}/{name}", self.public_base))
    }
}
