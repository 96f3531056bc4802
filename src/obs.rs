//! Instrumentation for MealForge API calls.
//!
//! Every public client operation reports itself under a [`CallKind`]: caller requests
//! (including their single replay), refresh exchanges, and login/registration. Nothing here
//! changes behavior; the hooks compile to no-ops unless a feature turns them on.
//!
//! # Feature Flags
//!
//! - `tracing`: each operation runs inside a `mealforge_client.call` span carrying `call` and
//!   `stage`. Relying on the gateway's 500-wrapped 401 logs a warning, and reusing another
//!   caller's refresh logs a debug event.
//! - `metrics`: the `mealforge_client_call_total` counter is incremented once on entry and once
//!   on exit of every operation, labeled by `call` and `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Client operation being instrumented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// `ApiClient::request` and the verb helpers built on it.
	Request,
	/// Exchange of the refresh token for a new access token.
	Refresh,
	/// Login or registration.
	SignIn,
}
impl CallKind {
	/// Label used for the `call` span field and metric label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Request => "request",
			Self::Refresh => "refresh",
			Self::SignIn => "sign_in",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Where an operation is in its lifecycle when it is recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// The operation started.
	Attempt,
	/// The caller received `Ok`.
	Success,
	/// The caller received `Err`.
	Failure,
}
impl CallOutcome {
	/// Maps a finished operation's result onto [`CallOutcome::Success`] or
	/// [`CallOutcome::Failure`].
	pub fn of<T, E>(result: &Result<T, E>) -> Self {
		if result.is_ok() { Self::Success } else { Self::Failure }
	}

	/// Label used for the `outcome` metric label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Attempt => "attempt",
			Self::Success => "success",
			Self::Failure => "failure",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
