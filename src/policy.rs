//! Authentication-failure classification.
//!
//! Whether a response means "the access token was rejected" is decided in exactly one
//! place: [`AuthFailurePolicy::classify`]. The client never inspects statuses or bodies
//! itself, so swapping the rule (for example once the gateway starts returning a clean
//! 401) means swapping the policy, not touching call sites.

// self
use crate::_prelude::*;

/// Substring the MealForge gateway embeds when it wraps an upstream 401 in a 500.
pub const GATEWAY_UNAUTHORIZED_MARKER: &str = "401 Client Error";

/// Decides whether a failed response should trigger a token refresh.
///
/// Implementors must be `Send + Sync`. Closures of the form
/// `Fn(&FailureContext) -> bool` implement the trait directly, returning
/// [`FailureClass::AuthRejected`] for `true`.
pub trait AuthFailurePolicy: Send + Sync {
	/// Classifies a non-success response.
	fn classify(&self, ctx: &FailureContext) -> FailureClass;
}
impl<F> AuthFailurePolicy for F
where
	F: Fn(&FailureContext) -> bool + Send + Sync,
{
	fn classify(&self, ctx: &FailureContext) -> FailureClass {
		if self(ctx) { FailureClass::AuthRejected } else { FailureClass::Application }
	}
}

/// Classification outcome for a failed response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureClass {
	/// The server rejected the bearer credential; a refresh may recover.
	AuthRejected,
	/// Any other failure; surfaced to the caller unchanged.
	Application,
}

/// Primitive view of a failed response handed to policies.
#[derive(Clone, Debug, PartialEq)]
pub struct FailureContext {
	/// HTTP status code.
	pub status: u16,
	/// Parsed response body (`Null` when empty, a string when not JSON).
	pub data: serde_json::Value,
}
impl FailureContext {
	/// Creates a context for the given status and body.
	pub fn new(status: u16, data: serde_json::Value) -> Self {
		Self { status, data }
	}

	/// Returns the body's `message` field, or the body itself when it is plain text.
	pub fn message(&self) -> Option<&str> {
		match &self.data {
			serde_json::Value::String(text) => Some(text),
			value => value.get("message").and_then(serde_json::Value::as_str),
		}
	}

	/// Whether the response is the gateway's 500 carrying an upstream 401.
	pub fn is_gateway_unauthorized(&self) -> bool {
		self.status == 500
			&& self.message().is_some_and(|message| message.contains(GATEWAY_UNAUTHORIZED_MARKER))
	}
}

/// Default policy: a clean 401, or the gateway's 500 wrapping an upstream 401.
///
/// The second form is a backend defect. Matching it emits a warning (with the `tracing`
/// feature) so deployments notice they still depend on it; use
/// [`UnauthorizedStatusPolicy`] once the backend is fixed.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultAuthFailurePolicy;
impl AuthFailurePolicy for DefaultAuthFailurePolicy {
	fn classify(&self, ctx: &FailureContext) -> FailureClass {
		if ctx.status == 401 {
			return FailureClass::AuthRejected;
		}
		if ctx.is_gateway_unauthorized() {
			crate::obs::warn_gateway_auth_marker(ctx.status);

			return FailureClass::AuthRejected;
		}

		FailureClass::Application
	}
}

/// Strict policy: only HTTP 401 counts as an authentication failure.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnauthorizedStatusPolicy;
impl AuthFailurePolicy for UnauthorizedStatusPolicy {
	fn classify(&self, ctx: &FailureContext) -> FailureClass {
		if ctx.status == 401 { FailureClass::AuthRejected } else { FailureClass::Application }
	}
}
