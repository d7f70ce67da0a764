use crate::error::RepoError;

/// An entity that can be stored in a [`Repo`].
///
/// The identifier is caller-assigned and must stay stable for the entity's
/// logical lifetime; it is the sole key every backend stores under. An empty
/// identifier is rejected by [`Repo::add`], not by this trait.
pub trait Identifiable {
    fn id(&self) -> &str;
}

/// Repo provides uniform keyed storage for one entity type over one backend.
///
/// All three implementations (`FileRepo`, `MemRepo`, `RedisRepo`) share the
/// same semantics: absence is `Ok(None)` / a successful no-op, never an error;
/// `add` is an upsert with last-write-wins; each call is self-contained with
/// no cross-call transactions.
pub trait Repo<T: Identifiable>: Send + Sync {
    /// Get the entity stored under `id`. Returns None if no record exists.
    fn get(&self, id: &str) -> Result<Option<T>, RepoError>;

    /// Get every stored entity, in backend-defined order.
    ///
    /// A record that disappears between enumeration and read is skipped.
    /// A record that fails to decode aborts the whole call.
    fn get_all(&self) -> Result<Vec<T>, RepoError>;

    /// Number of stored records. Not cached; may race with concurrent
    /// writers. Only records this repository recognizes are counted — the
    /// file backend excludes subdirectories and foreign filenames, so counts
    /// agree across backends holding the same records.
    fn count(&self) -> Result<u64, RepoError>;

    /// Store `entry` under its identifier, overwriting any prior record.
    /// Returns `RepoError::EmptyId` if the identifier is empty.
    fn add(&self, entry: &T) -> Result<(), RepoError>;

    /// Delete the record under `id`. Removing a nonexistent id is a no-op.
    fn remove(&self, id: &str) -> Result<(), RepoError>;

    /// Release in-process resources. Calls after close are undefined but
    /// must not panic.
    fn close(&self) -> Result<(), RepoError>;
}
