//! Storage contracts and built-in key-value stores for session credentials.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Key under which the access token is persisted.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Key under which the refresh token is persisted.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
/// Key under which the signed-in user's display name is persisted.
pub const USERNAME_KEY: &str = "username";

/// Durable, synchronous key-value storage used to persist session credentials.
///
/// The contract mirrors browser local storage: string keys, string values, and no
/// transactions. Implementations must be `Send + Sync` so a single store can back a
/// session shared across tasks.
pub trait KeyValueStore
where
	Self: Send + Sync,
{
	/// Returns the value stored under `key`, if any.
	fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

	/// Stores `value` under `key`, replacing any previous value.
	fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

	/// Removes `key`; removing a missing key is not an error.
	fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Error type produced by [`KeyValueStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
