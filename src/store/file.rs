//! Simple file-backed [`KeyValueStore`] that survives process restarts.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{KeyValueStore, StoreError},
};

/// Persists entries to a JSON object file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<BTreeMap<String, String>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Returns the backing file path.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
		if !path.exists() {
			return Ok(BTreeMap::new());
		}

		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(BTreeMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}
		Ok(())
	}

	fn persist_locked(&self, contents: &BTreeMap<String, String>) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl KeyValueStore for FileStore {
	fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		Ok(self.inner.read().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
		let mut guard = self.inner.write();
		let mut next = guard.clone();

		next.insert(key.to_owned(), value.to_owned());
		self.persist_locked(&next)?;

		*guard = next;

		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), StoreError> {
		let mut guard = self.inner.write();

		if !guard.contains_key(key) {
			return Ok(());
		}

		let mut next = guard.clone();

		next.remove(key);
		self.persist_locked(&next)?;

		*guard = next;

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;
	use crate::store::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USERNAME_KEY};

	fn temp_path(label: &str) -> PathBuf {
		let unique = format!(
			"mealforge_file_store_{label}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn set_and_reload_round_trip() {
		let path = temp_path("reload");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");

		store.set(ACCESS_TOKEN_KEY, "access-token").expect("Failed to persist access token.");
		store.set(REFRESH_TOKEN_KEY, "refresh-token").expect("Failed to persist refresh token.");
		store.set(USERNAME_KEY, "chef").expect("Failed to persist username.");
		store.remove(USERNAME_KEY).expect("Failed to remove username.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");

		assert_eq!(
			reopened.get(ACCESS_TOKEN_KEY).expect("File store reads should succeed."),
			Some("access-token".into())
		);
		assert_eq!(
			reopened.get(REFRESH_TOKEN_KEY).expect("File store reads should succeed."),
			Some("refresh-token".into())
		);
		assert_eq!(reopened.get(USERNAME_KEY).expect("File store reads should succeed."), None);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn failed_persist_leaves_reads_unchanged() {
		let dir = temp_path("unwritable");
		let path = dir.join("session.json");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");

		store.set(ACCESS_TOKEN_KEY, "persisted").expect("Failed to persist access token.");
		fs::remove_dir_all(&dir).expect("Failed to remove store directory.");
		fs::write(&dir, b"blocks the directory").expect("Failed to write blocking file.");

		store
			.set(ACCESS_TOKEN_KEY, "unpersisted")
			.expect_err("Writes should fail when the directory cannot be created.");
		store.remove(ACCESS_TOKEN_KEY).expect_err("Removals should fail for the same reason.");

		assert_eq!(
			store.get(ACCESS_TOKEN_KEY).expect("File store reads should succeed."),
			Some("persisted".into())
		);

		fs::remove_file(&dir).unwrap_or_else(|e| {
			panic!("Failed to remove blocking file {}: {e}", dir.display())
		});
	}

	#[test]
	fn corrupt_snapshot_is_reported() {
		let path = temp_path("corrupt");

		fs::write(&path, b"not json").expect("Failed to write corrupt fixture.");

		let err = FileStore::open(&path).expect_err("Corrupt snapshots should fail to load.");

		assert!(matches!(err, StoreError::Serialization { .. }));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
