//! Transport primitives for API calls.
//!
//! The module exposes [`ApiTransport`] alongside the crate-owned [`OutboundRequest`] and
//! [`RawResponse`] types so downstream crates can plug in any HTTP stack (or a scripted
//! fake in tests) without the client ever depending on reqwest-specific structures.
//! The client builds a fully resolved [`OutboundRequest`] (absolute URL, headers, encoded
//! body), hands it to the transport, and classifies the [`RawResponse`] it gets back.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")] use reqwest::header::HeaderMap;
use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;

/// Boxed future returned by [`ApiTransport::send`].
pub type TransportFuture<'a, E> = Pin<Box<dyn Future<Output = Result<RawResponse, E>> + 'a + Send>>;

/// Abstraction over HTTP transports able to execute API calls.
///
/// The trait is the client's only dependency on an HTTP stack. Implementations must be
/// `Send + Sync + 'static` so one transport can be shared by clones of the client, and the
/// futures they return must be `Send` so callers can spawn requests onto multi-threaded
/// executors. Transports report every HTTP response (including 4xx/5xx) as `Ok`; only
/// failures where no response arrived should surface as `Err`.
pub trait ApiTransport
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted when no response was received.
	type TransportError: 'static + Send + Sync + StdError;

	/// Executes the request and returns the raw response.
	fn send(&self, request: OutboundRequest) -> TransportFuture<'_, Self::TransportError>;
}

/// HTTP verbs used by the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the canonical upper-case verb.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Fully resolved request handed to an [`ApiTransport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundRequest {
	/// HTTP verb.
	pub method: Method,
	/// Absolute URL including query pairs.
	pub url: Url,
	/// Header map with lower-case names.
	pub headers: BTreeMap<String, String>,
	/// Encoded body, if any.
	pub body: Option<Vec<u8>>,
}
impl OutboundRequest {
	/// Creates a request without headers or body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: BTreeMap::new(), body: None }
	}

	/// Returns a header value by case-insensitive name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// Returns the `Authorization` header, if one was attached.
	pub fn authorization(&self) -> Option<&str> {
		self.header(AUTHORIZATION)
	}

	/// Parses the body as JSON, if present and well formed.
	pub fn json_body(&self) -> Option<serde_json::Value> {
		self.body.as_deref().and_then(|bytes| serde_json::from_slice(bytes).ok())
	}
}

/// Raw HTTP response returned by an [`ApiTransport`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawResponse {
	/// HTTP status code.
	pub status: u16,
	/// Header map with lower-case names.
	pub headers: BTreeMap<String, String>,
	/// Undecoded body bytes.
	pub body: Vec<u8>,
}
impl RawResponse {
	/// Creates a response with the provided status and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: BTreeMap::new(), body: body.into() }
	}

	/// Creates a JSON response with the matching content type.
	pub fn json(status: u16, value: &serde_json::Value) -> Self {
		let mut response = Self::new(status, value.to_string());

		response.headers.insert(CONTENT_TYPE.into(), JSON_CONTENT_TYPE.into());

		response
	}

	/// Whether the status is in the 2xx range.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Decodes the body leniently: `Null` when empty, JSON when parseable, text otherwise.
	pub fn data(&self) -> serde_json::Value {
		if self.body.iter().all(u8::is_ascii_whitespace) {
			return serde_json::Value::Null;
		}

		serde_json::from_slice(&self.body).unwrap_or_else(|_| {
			serde_json::Value::String(String::from_utf8_lossy(&self.body).into_owned())
		})
	}

	/// Parses the `Retry-After` header into a relative duration.
	pub fn retry_after(&self) -> Option<Duration> {
		parse_retry_after(self.headers.get(RETRY_AFTER)?)
	}
}

pub(crate) const AUTHORIZATION: &str = "authorization";
pub(crate) const CONTENT_TYPE: &str = "content-type";
pub(crate) const JSON_CONTENT_TYPE: &str = "application/json";
const RETRY_AFTER: &str = "retry-after";

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a transport whose requests time out after `timeout`.
	pub fn with_timeout(timeout: std::time::Duration) -> Result<Self, crate::error::ConfigError> {
		Ok(Self(ReqwestClient::builder().timeout(timeout).build()?))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Debug for ReqwestTransport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ReqwestTransport(..)")
	}
}
#[cfg(feature = "reqwest")]
impl ApiTransport for ReqwestTransport {
	type TransportError = ReqwestError;

	fn send(&self, request: OutboundRequest) -> TransportFuture<'_, Self::TransportError> {
		let client = self.0.clone();

		Box::pin(async move {
			let method = match request.method {
				Method::Get => reqwest::Method::GET,
				Method::Post => reqwest::Method::POST,
				Method::Put => reqwest::Method::PUT,
				Method::Patch => reqwest::Method::PATCH,
				Method::Delete => reqwest::Method::DELETE,
			};
			let mut builder = client.request(method, request.url);

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let headers = collect_headers(response.headers());
			let body = response.bytes().await?.to_vec();

			Ok(RawResponse { status, headers, body })
		})
	}
}

#[cfg(feature = "reqwest")]
fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
	headers
		.iter()
		.filter_map(|(name, value)| {
			value.to_str().ok().map(|v| (name.as_str().to_ascii_lowercase(), v.to_owned()))
		})
		.collect()
}

fn parse_retry_after(raw: &str) -> Option<Duration> {
	let raw = raw.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
