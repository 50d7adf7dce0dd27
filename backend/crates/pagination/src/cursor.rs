//! Opaque keyset cursor encoding.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors raised while encoding or decoding a cursor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    /// The key could not be serialised.
    #[error("cursor key could not be encoded: {message}")]
    Encode {
        /// Serialiser failure description.
        message: String,
    },
    /// The cursor is not valid URL-safe base64.
    #[error("cursor is not valid base64: {message}")]
    Base64 {
        /// Decoder failure description.
        message: String,
    },
    /// The decoded bytes do not describe a key of the expected shape.
    #[error("cursor payload is malformed: {message}")]
    Payload {
        /// Deserialiser failure description.
        message: String,
    },
}

/// Keyset position wrapped for transport as an opaque string.
///
/// The key is serialised as JSON and encoded with URL-safe base64 without
/// padding so it can travel in query strings untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor<K> {
    key: K,
}

impl<K> Cursor<K> {
    /// Wrap a keyset position.
    pub const fn new(key: K) -> Self {
        Self { key }
    }

    /// Borrow the keyset position.
    pub const fn key(&self) -> &K {
        &self.key
    }

    /// Consume the cursor and return the keyset position.
    pub fn into_inner(self) -> K {
        self.key
    }
}

impl<K> Cursor<K>
where
    K: Serialize,
{
    /// Encode the cursor as an opaque string.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::Encode`] when the key cannot be serialised.
    pub fn encode(&self) -> Result<String, CursorError> {
        let bytes = serde_json::to_vec(&self.key).map_err(|err| CursorError::Encode {
            message: err.to_string(),
        })?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }
}

impl<K> Cursor<K>
where
    K: DeserializeOwned,
{
    /// Decode an opaque string produced by [`Cursor::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::Base64`] for invalid encodings and
    /// [`CursorError::Payload`] when the payload does not match `K`.
    pub fn decode(value: &str) -> Result<Self, CursorError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(value.trim())
            .map_err(|err| CursorError::Base64 {
                message: err.to_string(),
            })?;
        let key = serde_json::from_slice(&bytes).map_err(|err| CursorError::Payload {
            message: err.to_string(),
        })?;
        Ok(Self { key })
    }
}
