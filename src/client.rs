//! Authenticated API client: bearer injection, auth-failure recovery, and verb helpers.
//!
//! Every call goes through [`ApiClient::request`]. The descriptor is resolved against the
//! configured base URL, the session's access token is attached unless the call is
//! anonymous, and the response is handed to the [`AuthFailurePolicy`]. A rejected bearer
//! credential triggers one single-flight refresh (see [`refresh`]) followed by one replay of
//! the same descriptor; whatever the replay returns is final.

pub mod account;
pub mod refresh;

pub use account::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*,
	auth::{Session, TokenSecret},
	config::ClientConfig,
	error::{ApiError, ConfigError, TransportError},
	http::{AUTHORIZATION, ApiTransport, OutboundRequest, RawResponse},
	obs::{self, CallKind, CallOutcome, CallSpan},
	policy::{AuthFailurePolicy, DefaultAuthFailurePolicy, FailureClass, FailureContext},
	request::{ApiRequest, ApiResponse, RequestOptions},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

/// Position of a descriptor in its recovery path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Attempt {
	/// Initial dispatch; an auth failure may still be recovered.
	First,
	/// Replay after a refresh; every failure is terminal.
	Retried,
}

/// Issues API calls against a fixed base URL on behalf of one [`Session`].
///
/// The client owns the transport, the configuration, and the auth-failure policy, and
/// shares the session plus the refresh guard with its clones so concurrent callers
/// coordinate on a single refresh.
pub struct ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Transport used for every outbound call, including refreshes.
	pub transport: Arc<T>,
	/// Validated base URL and endpoint paths.
	pub config: ClientConfig,
	/// Credential owner read by every request and written by refreshes.
	pub session: Arc<Session>,
	/// Single decision point for "the access token was rejected".
	pub policy: Arc<dyn AuthFailurePolicy>,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	refresh_guard: Arc<AsyncMutex<()>>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates a client over the caller-provided transport with the default policy.
	pub fn with_transport(
		config: ClientConfig,
		session: Arc<Session>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		Self {
			transport: transport.into(),
			config,
			session,
			policy: Arc::new(DefaultAuthFailurePolicy),
			refresh_metrics: Default::default(),
			refresh_guard: Default::default(),
		}
	}

	/// Replaces the auth-failure policy.
	pub fn with_policy(mut self, policy: impl 'static + AuthFailurePolicy) -> Self {
		self.policy = Arc::new(policy);

		self
	}

	/// Issues a request, transparently refreshing the access token at most once.
	pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: CallKind = CallKind::Request;

		let span = CallSpan::new(KIND, "request");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span.instrument(self.execute(&request)).await;

		obs::record_call_result(KIND, &result);

		result
	}

	/// `GET path` with optional query pairs.
	pub async fn get(
		&self,
		path: &str,
		query: &[(&str, &str)],
		options: RequestOptions,
	) -> Result<ApiResponse> {
		let request = query
			.iter()
			.fold(ApiRequest::get(path), |request, (key, value)| request.query(*key, value));

		self.request(request.with_options(options)).await
	}

	/// `POST path` with an optional JSON body.
	pub async fn post(
		&self,
		path: &str,
		body: Option<serde_json::Value>,
		options: RequestOptions,
	) -> Result<ApiResponse> {
		self.request(with_body(ApiRequest::post(path), body).with_options(options)).await
	}

	/// `PUT path` with an optional JSON body.
	pub async fn put(
		&self,
		path: &str,
		body: Option<serde_json::Value>,
		options: RequestOptions,
	) -> Result<ApiResponse> {
		self.request(with_body(ApiRequest::put(path), body).with_options(options)).await
	}

	/// `DELETE path`.
	pub async fn delete(&self, path: &str, options: RequestOptions) -> Result<ApiResponse> {
		self.request(ApiRequest::delete(path).with_options(options)).await
	}

	async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
		let outbound = request.resolve(&self.config.base_url)?;
		let snapshot = self.session.snapshot();
		let mut bearer = if request.no_auth { None } else { snapshot.access_token };
		let mut attempt = Attempt::First;

		loop {
			let raw = self.dispatch(outbound.clone(), bearer.as_ref()).await?;

			if raw.is_success() {
				return Ok(ApiResponse::from_raw(raw));
			}

			let failure = api_error(raw);

			if request.no_auth || attempt == Attempt::Retried || !self.is_auth_rejection(&failure) {
				return Err(failure.into());
			}

			attempt = Attempt::Retried;
			bearer = Some(self.recover(snapshot.epoch).await?);
		}
	}

	fn is_auth_rejection(&self, failure: &ApiError) -> bool {
		let ctx = FailureContext::new(failure.status, failure.data.clone());

		self.policy.classify(&ctx) == FailureClass::AuthRejected
	}

	pub(crate) async fn dispatch(
		&self,
		mut outbound: OutboundRequest,
		bearer: Option<&TokenSecret>,
	) -> Result<RawResponse, TransportError> {
		if let Some(token) = bearer {
			outbound.headers.insert(AUTHORIZATION.into(), token.bearer());
		}

		self.transport.send(outbound).await.map_err(TransportError::network)
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a client that provisions its own reqwest transport.
	///
	/// The configuration's timeout, if any, is applied to the transport.
	pub fn new(config: ClientConfig, session: Arc<Session>) -> Result<Self> {
		let transport = match config.timeout {
			Some(timeout) => ReqwestTransport::with_timeout(timeout)?,
			None => ReqwestTransport::default(),
		};

		Ok(Self::with_transport(config, session, transport))
	}

	/// Builds a client for `base_url` with the default endpoint paths and no timeout.
	pub fn from_base(base_url: &str, session: Arc<Session>) -> Result<Self> {
		let config = ClientConfig::from_base(base_url).map_err(ConfigError::from)?;

		Self::new(config, session)
	}
}
impl<T> Clone for ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			config: self.config.clone(),
			session: self.session.clone(),
			policy: self.policy.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			refresh_guard: self.refresh_guard.clone(),
		}
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("session", &self.session)
			.finish()
	}
}

fn with_body(request: ApiRequest, body: Option<serde_json::Value>) -> ApiRequest {
	match body {
		Some(body) => request.json(body),
		None => request,
	}
}

fn api_error(raw: RawResponse) -> ApiError {
	ApiError { status: raw.status, data: raw.data(), retry_after: raw.retry_after() }
}
