//! Client-level error types shared across requests, refreshes, and stores.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure while persisting or restoring credentials.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS); no response was received.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Token refresh failed; the session has ended and the user must sign in again.
	#[error(transparent)]
	Refresh(#[from] RefreshError),
	/// Server answered with a non-success status.
	#[error(transparent)]
	Api(#[from] ApiError),

	/// A success body could not be decoded into the requested type.
	#[error("Response body with status {status} could not be decoded.")]
	Decode {
		/// Structured parsing failure naming the offending JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the decoded response.
		status: u16,
	},
}
impl Error {
	/// Returns the HTTP status attached to the failure, when one was received.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Api(e) => Some(e.status),
			Self::Refresh(RefreshError::Rejected { status, .. }) => Some(*status),
			Self::Decode { status, .. } => Some(*status),
			_ => None,
		}
	}

	/// Whether the caller must re-authenticate before retrying.
	pub fn is_session_ended(&self) -> bool {
		matches!(self, Self::Refresh(_))
	}
}

/// Configuration and validation failures raised before any request is dispatched.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Client configuration failed validation.
	#[error(transparent)]
	InvalidClientConfig(#[from] crate::config::ClientConfigError),
	/// Request path is absolute or escapes the configured base URL.
	#[error("Request path `{path}` must be relative to the API base URL.")]
	InvalidPath {
		/// Offending path as supplied by the caller.
		path: String,
	},
	/// Request path could not be joined onto the base URL.
	#[error("Request path `{path}` could not be resolved.")]
	UnresolvablePath {
		/// Offending path as supplied by the caller.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body could not be encoded as JSON.
	#[error("Request body could not be encoded as JSON.")]
	RequestEncode(#[source] serde_json::Error),
	/// Caller supplied a header the transport cannot represent.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failure raised when the transport never produced a response.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}

/// Non-success response returned by the API.
#[derive(Clone, Debug, PartialEq, ThisError)]
#[error("API responded with status {status}.")]
pub struct ApiError {
	/// HTTP status code.
	pub status: u16,
	/// Parsed response body (`Null` when empty, a string when not JSON).
	pub data: serde_json::Value,
	/// Retry-After hint from upstream, if supplied.
	pub retry_after: Option<Duration>,
}
impl ApiError {
	/// Returns the server-supplied `message` field, if present.
	pub fn message(&self) -> Option<&str> {
		self.data.get("message").and_then(serde_json::Value::as_str)
	}
}

/// Terminal refresh failures.
///
/// Cloneable so one failed refresh can be handed to every caller waiting on it.
#[derive(Clone, Debug, ThisError)]
pub enum RefreshError {
	/// No refresh token is held by the session.
	#[error("No refresh token is available.")]
	MissingRefreshToken,
	/// Refresh endpoint rejected the refresh token.
	#[error("Refresh endpoint rejected the refresh token with status {status}.")]
	Rejected {
		/// HTTP status code returned by the refresh endpoint.
		status: u16,
		/// Parsed response body.
		data: serde_json::Value,
	},
	/// Refresh endpoint answered with a body lacking a usable access token.
	#[error("Refresh endpoint returned a malformed response: {message}.")]
	MalformedResponse {
		/// Human-readable parsing failure.
		message: String,
	},
	/// Refresh call never received a response.
	#[error("Network error occurred while refreshing the access token.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// Refreshed credentials could not be persisted.
	#[error("Refreshed credentials could not be persisted.")]
	Storage(#[source] crate::store::StoreError),
}
impl RefreshError {
	pub(crate) fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Arc::new(src) }
	}
}
