//! Authenticated HTTP client for the MealForge recipe API: bearer injection, single-flight
//! token refresh with one transparent replay, and durable session storage.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod policy;
pub mod request;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
#[doc(hidden)]
pub mod _preludet {
	//! Re-exports and client fixtures for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{Credentials, Session},
		client::ReqwestApiClient,
		config::ClientConfig,
		store::{KeyValueStore, MemoryStore},
	};

	/// Builds a configuration rooted at `base_url`, panicking on invalid fixtures.
	pub fn test_config(base_url: &str) -> ClientConfig {
		ClientConfig::from_base(base_url).expect("Failed to build client config fixture.")
	}

	/// Builds a session over a fresh [`MemoryStore`], optionally seeded with credentials.
	pub fn test_session(credentials: Option<Credentials>) -> (Arc<Session>, MemoryStore) {
		let store = MemoryStore::default();
		let backend: Arc<dyn KeyValueStore> = Arc::new(store.clone());
		let session = Session::restore(backend).expect("Failed to restore empty test session.");

		if let Some(credentials) = credentials {
			session
				.establish(credentials, Some("test-chef"))
				.expect("Failed to seed test session credentials.");
		}

		(Arc::new(session), store)
	}

	/// Constructs a reqwest-backed client against `base_url` plus the store backing its
	/// session.
	pub fn build_reqwest_test_client(
		base_url: &str,
		credentials: Option<Credentials>,
	) -> (ReqwestApiClient, MemoryStore) {
		let (session, store) = test_session(credentials);
		let client = ReqwestApiClient::new(test_config(base_url), session)
			.expect("Failed to build reqwest test client.");

		(client, store)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
