use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::RepoError;

/// Codec translates a typed entity to and from a byte sequence.
///
/// Backends depend on this boundary only through `encode`/`decode`; the wire
/// format is otherwise opaque to them. Pluggable at repository construction,
/// defaulting to [`JsonCodec`].
pub trait Codec<T>: Send + Sync {
    fn encode(&self, val: &T) -> Result<Vec<u8>, RepoError>;
    fn decode(&self, data: &[u8]) -> Result<T, RepoError>;
}

/// The default codec: serde_json.
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Codec<T> for JsonCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, val: &T) -> Result<Vec<u8>, RepoError> {
        serde_json::to_vec(val).map_err(|e| RepoError::Codec(e.to_string()))
    }

    fn decode(&self, data: &[u8]) -> Result<T, RepoError> {
        serde_json::from_slice(data).map_err(|e| RepoError::Codec(e.to_string()))
    }
}
