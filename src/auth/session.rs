//! Explicitly owned session state: the credential pair, its durable copy, and refresh epochs.
//!
//! A [`Session`] is the only place tokens live. It writes through to a [`KeyValueStore`]
//! before updating memory, so a failed write never leaves the in-memory pair ahead of the
//! durable one. Every credential change bumps an epoch counter; the client snapshots the
//! epoch before dispatching and compares it after an authentication failure to tell whether
//! another caller already refreshed (or failed to refresh) in the meantime.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::RefreshError,
	store::{
		ACCESS_TOKEN_KEY, KeyValueStore, MemoryStore, REFRESH_TOKEN_KEY, StoreError, USERNAME_KEY,
	},
};

/// Access/refresh token pair held by a [`Session`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
	/// Bearer credential attached to authenticated requests.
	pub access_token: Option<TokenSecret>,
	/// Longer-lived secret exchanged for a new access token.
	pub refresh_token: Option<TokenSecret>,
}
impl Credentials {
	/// Builds a complete pair.
	pub fn new(access_token: impl Into<TokenSecret>, refresh_token: impl Into<TokenSecret>) -> Self {
		Self {
			access_token: Some(access_token.into()),
			refresh_token: Some(refresh_token.into()),
		}
	}
}

/// Point-in-time view taken before a request is dispatched.
#[derive(Clone, Debug)]
pub(crate) struct SessionSnapshot {
	pub(crate) epoch: u64,
	pub(crate) access_token: Option<TokenSecret>,
}

#[derive(Debug, Default)]
struct SessionState {
	credentials: Credentials,
	username: Option<String>,
	epoch: u64,
	refresh_failure: Option<RefreshError>,
	refreshed_at: Option<OffsetDateTime>,
}
impl SessionState {
	fn advance(&mut self) {
		self.epoch = self.epoch.wrapping_add(1);
	}
}

/// Owner of the credential pair for one signed-in user.
///
/// Share it behind an [`Arc`]; all accessors take `&self`.
pub struct Session {
	store: Arc<dyn KeyValueStore>,
	state: RwLock<SessionState>,
}
impl Session {
	/// Restores a session from whatever the store already holds.
	pub fn restore(store: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
		let access_token = store.get(ACCESS_TOKEN_KEY)?.map(TokenSecret::new);
		let refresh_token = store.get(REFRESH_TOKEN_KEY)?.map(TokenSecret::new);
		let username = store.get(USERNAME_KEY)?;
		let state = SessionState {
			credentials: Credentials { access_token, refresh_token },
			username,
			..Default::default()
		};

		Ok(Self { store, state: RwLock::new(state) })
	}

	/// Creates an empty session backed by a fresh [`MemoryStore`].
	pub fn in_memory() -> Self {
		Self { store: Arc::new(MemoryStore::default()), state: RwLock::new(SessionState::default()) }
	}

	/// Returns the backing store.
	pub fn store(&self) -> &Arc<dyn KeyValueStore> {
		&self.store
	}

	/// Returns a copy of the held credential pair.
	pub fn credentials(&self) -> Credentials {
		self.state.read().credentials.clone()
	}

	/// Returns the held access token.
	pub fn access_token(&self) -> Option<TokenSecret> {
		self.state.read().credentials.access_token.clone()
	}

	/// Returns the held refresh token.
	pub fn refresh_token(&self) -> Option<TokenSecret> {
		self.state.read().credentials.refresh_token.clone()
	}

	/// Returns the signed-in user's display name.
	pub fn username(&self) -> Option<String> {
		self.state.read().username.clone()
	}

	/// Whether an access token is currently held.
	pub fn is_authenticated(&self) -> bool {
		self.state.read().credentials.access_token.is_some()
	}

	/// Instant of the last successful refresh performed through this session.
	pub fn refreshed_at(&self) -> Option<OffsetDateTime> {
		self.state.read().refreshed_at
	}

	/// Replaces the whole pair after a login or registration.
	pub fn establish(
		&self,
		credentials: Credentials,
		username: Option<&str>,
	) -> Result<(), StoreError> {
		let mut state = self.state.write();
		let mut writes = vec![
			(ACCESS_TOKEN_KEY, credentials.access_token.as_ref().map(TokenSecret::expose)),
			(REFRESH_TOKEN_KEY, credentials.refresh_token.as_ref().map(TokenSecret::expose)),
		];

		if let Some(name) = username {
			writes.push((USERNAME_KEY, Some(name)));
		}

		write_all_or_restore(self.store.as_ref(), &writes)?;

		if let Some(name) = username {
			state.username = Some(name.to_owned());
		}

		state.credentials = credentials;
		state.refresh_failure = None;
		state.advance();

		Ok(())
	}

	/// Persists and holds a new access token; the refresh token is left untouched.
	pub fn set_access_token(&self, token: impl Into<TokenSecret>) -> Result<(), StoreError> {
		let token = token.into();
		let mut state = self.state.write();

		self.store.set(ACCESS_TOKEN_KEY, token.expose())?;

		state.credentials.access_token = Some(token);
		state.refresh_failure = None;
		state.advance();

		Ok(())
	}

	/// Drops the access token from memory and storage; refresh token and username remain.
	pub fn clear_access_token(&self) -> Result<(), StoreError> {
		let mut state = self.state.write();

		self.store.remove(ACCESS_TOKEN_KEY)?;

		state.credentials.access_token = None;
		state.advance();

		Ok(())
	}

	pub(crate) fn snapshot(&self) -> SessionSnapshot {
		let state = self.state.read();

		SessionSnapshot { epoch: state.epoch, access_token: state.credentials.access_token.clone() }
	}

	/// Returns what happened to the credentials since `epoch`, if anything.
	///
	/// `None` means the caller's view is current and it must refresh itself.
	pub(crate) fn outcome_since(&self, epoch: u64) -> Option<Result<TokenSecret, RefreshError>> {
		let state = self.state.read();

		if state.epoch == epoch {
			return None;
		}
		if let Some(failure) = &state.refresh_failure {
			return Some(Err(failure.clone()));
		}

		state.credentials.access_token.clone().map(Ok)
	}

	pub(crate) fn apply_refresh(
		&self,
		access_token: TokenSecret,
		rotated_refresh: Option<TokenSecret>,
	) -> Result<(), StoreError> {
		let mut state = self.state.write();
		let mut writes = vec![(ACCESS_TOKEN_KEY, Some(access_token.expose()))];

		if let Some(refresh) = &rotated_refresh {
			writes.push((REFRESH_TOKEN_KEY, Some(refresh.expose())));
		}

		write_all_or_restore(self.store.as_ref(), &writes)?;

		state.credentials.access_token = Some(access_token);

		if rotated_refresh.is_some() {
			state.credentials.refresh_token = rotated_refresh;
		}

		state.refresh_failure = None;
		state.refreshed_at = Some(OffsetDateTime::now_utc());
		state.advance();

		Ok(())
	}

	pub(crate) fn record_refresh_failure(&self, failure: RefreshError) {
		let mut state = self.state.write();

		state.refresh_failure = Some(failure);
		state.advance();
	}
}
impl Debug for Session {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.read();

		f.debug_struct("Session")
			.field("username", &state.username)
			.field("access_token_set", &state.credentials.access_token.is_some())
			.field("refresh_token_set", &state.credentials.refresh_token.is_some())
			.field("epoch", &state.epoch)
			.finish()
	}
}

fn write_value(
	store: &dyn KeyValueStore,
	key: &str,
	value: Option<&str>,
) -> Result<(), StoreError> {
	match value {
		Some(value) => store.set(key, value),
		None => store.remove(key),
	}
}

/// Applies `writes` in order. When one fails, keys already written are put back to their
/// previous values (best effort) before the failure is returned, so the store never keeps
/// half of a credential pair.
fn write_all_or_restore(
	store: &dyn KeyValueStore,
	writes: &[(&str, Option<&str>)],
) -> Result<(), StoreError> {
	let mut applied: Vec<(&str, Option<String>)> = Vec::with_capacity(writes.len());

	for &(key, value) in writes {
		let previous = store.get(key)?;

		if let Err(e) = write_value(store, key, value) {
			for (key, previous) in applied.iter().rev() {
				let _ = write_value(store, key, Option::as_deref(previous));
			}

			return Err(e);
		}

		applied.push((key, previous));
	}

	Ok(())
}
