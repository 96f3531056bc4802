//! Request descriptors and parsed responses exchanged with callers.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::{AUTHORIZATION, CONTENT_TYPE, JSON_CONTENT_TYPE, Method, OutboundRequest, RawResponse},
};

/// Per-call options recognized by the verb helpers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
	/// Skip bearer injection and the refresh-and-retry path.
	pub no_auth: bool,
}
impl RequestOptions {
	/// Options for an anonymous call.
	pub const fn anonymous() -> Self {
		Self { no_auth: true }
	}
}

/// Immutable description of one API call.
///
/// The descriptor carries no retry state; the client tracks attempts separately so a
/// descriptor can be reused or shared without one call influencing another.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
	/// HTTP verb.
	pub method: Method,
	/// Path relative to the configured base URL.
	pub path: String,
	/// Query pairs appended in order.
	pub query: Vec<(String, String)>,
	/// JSON body, if any.
	pub body: Option<serde_json::Value>,
	/// Extra headers, lower-cased on resolution; `Authorization` in any case is managed by
	/// the client and ignored here.
	pub headers: BTreeMap<String, String>,
	/// Skip bearer injection and the refresh-and-retry path.
	pub no_auth: bool,
}
impl ApiRequest {
	/// Creates a descriptor for an arbitrary verb.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			body: None,
			headers: BTreeMap::new(),
			no_auth: false,
		}
	}

	/// `GET` descriptor.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// `POST` descriptor.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// `PUT` descriptor.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::Put, path)
	}

	/// `DELETE` descriptor.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	/// Appends a query pair.
	pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		self.query.push((key.into(), value.to_string()));

		self
	}

	/// Sets a JSON body.
	pub fn json(mut self, body: serde_json::Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Serializes `body` and sets it as the JSON body.
	pub fn with_json<T>(self, body: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		let value = serde_json::to_value(body).map_err(ConfigError::RequestEncode)?;

		Ok(self.json(value))
	}

	/// Adds an extra header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into().to_ascii_lowercase(), value.into());

		self
	}

	/// Marks the call as anonymous.
	pub fn no_auth(mut self) -> Self {
		self.no_auth = true;

		self
	}

	/// Applies caller options.
	pub fn with_options(mut self, options: RequestOptions) -> Self {
		self.no_auth = options.no_auth;

		self
	}

	/// Resolves the descriptor against `base` into a transport-ready request without
	/// credentials.
	pub(crate) fn resolve(&self, base: &Url) -> Result<OutboundRequest, ConfigError> {
		let url = resolve_path(base, &self.path)?;
		let mut request = OutboundRequest::new(self.method, url);

		if !self.query.is_empty() {
			request.url.query_pairs_mut().extend_pairs(self.query.iter());
		}

		for (name, value) in &self.headers {
			if name.is_empty() || name.contains(|c: char| c.is_ascii_whitespace() || c == ':') {
				return Err(ConfigError::InvalidHeader { name: name.clone() });
			}
			if name.eq_ignore_ascii_case(AUTHORIZATION) {
				continue;
			}

			request.headers.insert(name.to_ascii_lowercase(), value.clone());
		}

		if let Some(body) = &self.body {
			let bytes = serde_json::to_vec(body).map_err(ConfigError::RequestEncode)?;

			request.headers.insert(CONTENT_TYPE.into(), JSON_CONTENT_TYPE.into());
			request.body = Some(bytes);
		}

		Ok(request)
	}
}

/// Joins a caller-supplied relative path onto the base URL, refusing anything that would
/// leave it.
pub(crate) fn resolve_path(base: &Url, path: &str) -> Result<Url, ConfigError> {
	if path.starts_with("//") || path.contains("://") {
		return Err(ConfigError::InvalidPath { path: path.to_owned() });
	}

	let relative = path.strip_prefix('/').unwrap_or(path);
	let url = base
		.join(relative)
		.map_err(|source| ConfigError::UnresolvablePath { path: path.to_owned(), source })?;

	if url.origin() != base.origin() || !url.path().starts_with(base.path()) {
		return Err(ConfigError::InvalidPath { path: path.to_owned() });
	}

	Ok(url)
}

/// Successful API response handed back to callers.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
	/// HTTP status code (2xx).
	pub status: u16,
	/// Parsed body (`Null` when empty, a string when not JSON).
	pub data: serde_json::Value,
	/// Response headers with lower-case names.
	pub headers: BTreeMap<String, String>,
}
impl ApiResponse {
	pub(crate) fn from_raw(raw: RawResponse) -> Self {
		let data = raw.data();

		Self { status: raw.status, data, headers: raw.headers }
	}

	/// Decodes the body into `T`, naming the failing JSON path on error.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		serde_path_to_error::deserialize(&self.data)
			.map_err(|source| Error::Decode { source, status: self.status })
	}

	/// Consumes the response and decodes the body into `T`.
	pub fn into_json<T>(self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let status = self.status;

		serde_path_to_error::deserialize(self.data)
			.map_err(|source| Error::Decode { source, status })
	}
}
