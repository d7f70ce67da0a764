//! Storage-agnostic keyed repositories for identifiable entities.
//!
//! One contract — [`Repo`] — implemented over three backends:
//!
//! - [`FileRepo`]: one file per entity under a root directory, with per-key
//!   read/write isolation synthesized from a lock table.
//! - [`MemRepo`]: an in-process map, for tests and ephemeral state.
//! - `RedisRepo` (feature `redis-backend`): delegates to a Redis server's
//!   native single-key commands.
//!
//! Entities are anything implementing [`Identifiable`]; the wire format is a
//! pluggable [`Codec`], defaulting to JSON.
//!
//! ```no_run
//! use entity_repo::{FileOptions, FileRepo, Identifiable, Repo};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Device {
//!     sn: String,
//!     model: u32,
//! }
//!
//! impl Identifiable for Device {
//!     fn id(&self) -> &str {
//!         &self.sn
//!     }
//! }
//!
//! # fn main() -> Result<(), entity_repo::RepoError> {
//! let opts = FileOptions::new("/var/lib/devices", "json")?;
//! let repo: FileRepo<Device> = FileRepo::new(opts)?;
//!
//! repo.add(&Device { sn: "h106-0001".into(), model: 106 })?;
//! let found = repo.get("h106-0001")?;
//! assert!(found.is_some());
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod error;
pub mod file;
pub mod mem;
pub mod traits;

#[cfg(feature = "redis-backend")]
pub mod redis;

pub use codec::{Codec, JsonCodec};
pub use error::RepoError;
pub use file::{FileOptions, FileRepo};
pub use mem::MemRepo;
pub use traits::{Identifiable, Repo};

#[cfg(feature = "redis-backend")]
pub use self::redis::RedisRepo;
