use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::RwLock;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec::{Codec, JsonCodec};
use crate::error::RepoError;
use crate::traits::{Identifiable, Repo};

/// MemRepo is a [`Repo`] implementation over an in-process map of
/// identifier → codec-encoded bytes.
///
/// Per-key atomicity comes entirely from the guarded map; no further locking
/// discipline is needed. Values round-trip through the codec exactly like the
/// file backend, so the two are behaviorally interchangeable.
pub struct MemRepo<T, C = JsonCodec<T>> {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
    codec: C,
    _marker: PhantomData<fn() -> T>,
}

impl<T> MemRepo<T, JsonCodec<T>>
where
    T: Identifiable + Serialize + DeserializeOwned,
{
    /// Create an empty repository with the default JSON codec.
    pub fn new() -> Self {
        Self::with_codec(JsonCodec::new())
    }
}

impl<T> Default for MemRepo<T, JsonCodec<T>>
where
    T: Identifiable + Serialize + DeserializeOwned,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C> MemRepo<T, C>
where
    T: Identifiable,
    C: Codec<T>,
{
    /// Create an empty repository with an explicit codec.
    pub fn with_codec(codec: C) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            codec,
            _marker: PhantomData,
        }
    }
}

impl<T, C> Repo<T> for MemRepo<T, C>
where
    T: Identifiable,
    C: Codec<T>,
{
    fn get(&self, id: &str) -> Result<Option<T>, RepoError> {
        let data = {
            let entries = self.entries.read().unwrap();
            match entries.get(id) {
                Some(data) => data.clone(),
                None => return Ok(None),
            }
        };

        Ok(Some(self.codec.decode(&data)?))
    }

    fn get_all(&self) -> Result<Vec<T>, RepoError> {
        let entries = self.entries.read().unwrap();

        let mut all = Vec::with_capacity(entries.len());
        for data in entries.values() {
            all.push(self.codec.decode(data)?);
        }

        Ok(all)
    }

    fn count(&self) -> Result<u64, RepoError> {
        Ok(self.entries.read().unwrap().len() as u64)
    }

    fn add(&self, entry: &T) -> Result<(), RepoError> {
        let id = entry.id();
        if id.is_empty() {
            return Err(RepoError::EmptyId);
        }

        let data = self.codec.encode(entry)?;
        self.entries.write().unwrap().insert(id.to_string(), data);
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<(), RepoError> {
        self.entries.write().unwrap().remove(id);
        Ok(())
    }

    fn close(&self) -> Result<(), RepoError> {
        self.entries.write().unwrap().clear();
        Ok(())
    }
}
