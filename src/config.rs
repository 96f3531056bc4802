//! Client configuration: base URL, fixed endpoint paths, and transport defaults.

// self
use crate::_prelude::*;

/// Errors raised while constructing or validating a [`ClientConfig`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ClientConfigError {
	/// Base URL could not be parsed.
	#[error("Base URL `{url}` is not a valid URL.")]
	UnparsableBaseUrl {
		/// Raw value that failed to parse.
		url: String,
	},
	/// Base URL must use HTTP or HTTPS.
	#[error("Base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Offending URL.
		url: String,
	},
	/// Base URL cannot carry a query string or fragment.
	#[error("Base URL must not carry a query or fragment: {url}.")]
	BaseUrlHasQuery {
		/// Offending URL.
		url: String,
	},
	/// Base URL cannot be used as a base (e.g. `mailto:`).
	#[error("Base URL cannot be used as a base: {url}.")]
	CannotBeABase {
		/// Offending URL.
		url: String,
	},
	/// Endpoint paths must be relative and non-empty.
	#[error("The {endpoint} path must be a non-empty relative path: `{path}`.")]
	InvalidEndpointPath {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Path that failed validation.
		path: String,
	},
}

/// Validated client configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Base URL every request path is resolved against; always ends with `/`.
	pub base_url: Url,
	/// Login endpoint, relative to the base URL.
	pub login_path: String,
	/// Registration endpoint, relative to the base URL.
	pub register_path: String,
	/// Refresh endpoint, relative to the base URL.
	pub refresh_path: String,
	/// Request timeout applied when the client provisions its own transport.
	#[serde(default, with = "timeout_secs")]
	pub timeout: Option<std::time::Duration>,
}
impl ClientConfig {
	/// Default login path.
	pub const DEFAULT_LOGIN_PATH: &'static str = "login/";
	/// Default registration path.
	pub const DEFAULT_REGISTER_PATH: &'static str = "register/";
	/// Default refresh path.
	pub const DEFAULT_REFRESH_PATH: &'static str = "refresh_token/";

	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Parses `base_url` and builds a configuration with default endpoint paths.
	pub fn from_base(base_url: &str) -> Result<Self, ClientConfigError> {
		let url = Url::parse(base_url)
			.map_err(|_| ClientConfigError::UnparsableBaseUrl { url: base_url.to_owned() })?;

		Self::builder(url).build()
	}

	/// Re-runs validation, e.g. after deserializing from a file.
	pub fn validate(self) -> Result<Self, ClientConfigError> {
		ClientConfigBuilder {
			base_url: self.base_url,
			login_path: self.login_path,
			register_path: self.register_path,
			refresh_path: self.refresh_path,
			timeout: self.timeout,
		}
		.build()
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Base URL for every request.
	pub base_url: Url,
	/// Login endpoint path.
	pub login_path: String,
	/// Registration endpoint path.
	pub register_path: String,
	/// Refresh endpoint path.
	pub refresh_path: String,
	/// Optional transport timeout.
	pub timeout: Option<std::time::Duration>,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with the default endpoint paths.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			login_path: ClientConfig::DEFAULT_LOGIN_PATH.into(),
			register_path: ClientConfig::DEFAULT_REGISTER_PATH.into(),
			refresh_path: ClientConfig::DEFAULT_REFRESH_PATH.into(),
			timeout: None,
		}
	}

	/// Overrides the login endpoint path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.login_path = path.into();

		self
	}

	/// Overrides the registration endpoint path.
	pub fn register_path(mut self, path: impl Into<String>) -> Self {
		self.register_path = path.into();

		self
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Sets the transport timeout.
	pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ClientConfigError> {
		let mut base_url = self.base_url;

		if !matches!(base_url.scheme(), "http" | "https") {
			return Err(ClientConfigError::UnsupportedScheme { url: base_url.to_string() });
		}
		if base_url.cannot_be_a_base() {
			return Err(ClientConfigError::CannotBeABase { url: base_url.to_string() });
		}
		if base_url.query().is_some() || base_url.fragment().is_some() {
			return Err(ClientConfigError::BaseUrlHasQuery { url: base_url.to_string() });
		}
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());

			base_url.set_path(&path);
		}

		let login_path = normalize_endpoint("login", self.login_path)?;
		let register_path = normalize_endpoint("register", self.register_path)?;
		let refresh_path = normalize_endpoint("refresh", self.refresh_path)?;

		Ok(ClientConfig { base_url, login_path, register_path, refresh_path, timeout: self.timeout })
	}
}

fn normalize_endpoint(endpoint: &'static str, path: String) -> Result<String, ClientConfigError> {
	let trimmed = path.trim_start_matches('/');

	if trimmed.is_empty() || trimmed.contains("://") {
		return Err(ClientConfigError::InvalidEndpointPath { endpoint, path });
	}

	Ok(trimmed.to_owned())
}

mod timeout_secs {
	// self
	use crate::_prelude::*;

	pub(super) fn serialize<S>(
		value: &Option<std::time::Duration>,
		serializer: S,
	) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		value.map(|timeout| timeout.as_secs_f64()).serialize(serializer)
	}

	pub(super) fn deserialize<'de, D>(
		deserializer: D,
	) -> Result<Option<std::time::Duration>, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let secs = Option::<f64>::deserialize(deserializer)?;

		secs.map(|value| {
			std::time::Duration::try_from_secs_f64(value).map_err(serde::de::Error::custom)
		})
		.transpose()
	}
}
