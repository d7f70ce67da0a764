use std::marker::PhantomData;
use std::sync::Mutex;

use redis::{Client, Commands, Connection};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec::{Codec, JsonCodec};
use crate::error::RepoError;
use crate::traits::{Identifiable, Repo};

/// RedisRepo is a [`Repo`] implementation delegating every operation to a
/// Redis server's native single-key commands (GET/SET/DEL/KEYS/MGET/DBSIZE).
///
/// Atomicity comes entirely from the server; no repository-side locking or
/// command composition is performed. The repository claims the whole logical
/// database, so `get_all` and `count` see every key in it.
pub struct RedisRepo<T, C = JsonCodec<T>> {
    // Cleared by close; operations after that report a storage error.
    client: Mutex<Option<Client>>,
    codec: C,
    _marker: PhantomData<fn() -> T>,
}

impl<T> RedisRepo<T, JsonCodec<T>>
where
    T: Identifiable + Serialize + DeserializeOwned,
{
    /// Wrap an already-configured client with the default JSON codec.
    pub fn new(client: Client) -> Self {
        Self::with_codec(client, JsonCodec::new())
    }
}

impl<T, C> RedisRepo<T, C>
where
    T: Identifiable,
    C: Codec<T>,
{
    /// Wrap an already-configured client with an explicit codec.
    pub fn with_codec(client: Client, codec: C) -> Self {
        Self {
            client: Mutex::new(Some(client)),
            codec,
            _marker: PhantomData,
        }
    }

    fn connect(&self) -> Result<Connection, RepoError> {
        let client = self
            .client
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| RepoError::Storage("repository is closed".into()))?;

        client
            .get_connection()
            .map_err(|e| RepoError::Storage(e.to_string()))
    }
}

impl<T, C> Repo<T> for RedisRepo<T, C>
where
    T: Identifiable,
    C: Codec<T>,
{
    fn get(&self, id: &str) -> Result<Option<T>, RepoError> {
        let mut con = self.connect()?;

        let data: Option<Vec<u8>> = con
            .get(id)
            .map_err(|e| RepoError::Storage(e.to_string()))?;

        match data {
            Some(data) => Ok(Some(self.codec.decode(&data)?)),
            None => Ok(None),
        }
    }

    fn get_all(&self) -> Result<Vec<T>, RepoError> {
        let mut con = self.connect()?;

        let keys: Vec<String> = con
            .keys("*")
            .map_err(|e| RepoError::Storage(e.to_string()))?;
        // MGET requires at least one key.
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<Option<Vec<u8>>> = con
            .mget(&keys)
            .map_err(|e| RepoError::Storage(e.to_string()))?;

        let mut all = Vec::with_capacity(values.len());
        for value in values {
            // A nil slot means the key vanished between KEYS and MGET.
            match value {
                Some(data) => all.push(self.codec.decode(&data)?),
                None => continue,
            }
        }

        Ok(all)
    }

    fn count(&self) -> Result<u64, RepoError> {
        let mut con = self.connect()?;

        redis::cmd("DBSIZE")
            .query(&mut con)
            .map_err(|e| RepoError::Storage(e.to_string()))
    }

    fn add(&self, entry: &T) -> Result<(), RepoError> {
        let id = entry.id();
        if id.is_empty() {
            return Err(RepoError::EmptyId);
        }

        let data = self.codec.encode(entry)?;
        let mut con = self.connect()?;

        let _: () = con
            .set(id, data)
            .map_err(|e| RepoError::Storage(e.to_string()))?;
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<(), RepoError> {
        let mut con = self.connect()?;

        // DEL of a missing key returns 0, which is still success.
        let _: u64 = con
            .del(id)
            .map_err(|e| RepoError::Storage(e.to_string()))?;
        Ok(())
    }

    fn close(&self) -> Result<(), RepoError> {
        *self.client.lock().unwrap() = None;
        Ok(())
    }
}
