//! Access-token refresh with a singleflight guard and epoch-based coalescing.
//!
//! Callers that see their bearer credential rejected funnel through
//! [`ApiClient::recover`]. The first one to take the guard performs the
//! `POST {base}/refresh_token/` exchange; everyone queued behind it compares the session
//! epoch they dispatched under with the current one and, when it moved, reuses the result
//! (the new access token or the shared [`RefreshError`]) instead of refreshing again.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	client::ApiClient,
	error::RefreshError,
	http::{ApiTransport, CONTENT_TYPE, JSON_CONTENT_TYPE, Method, OutboundRequest},
	obs::{self, CallKind, CallOutcome, CallSpan},
	request::resolve_path,
};

#[derive(Deserialize)]
struct RefreshResponse {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
}

impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Forces a refresh regardless of the current token, serialized with concurrent
	/// recoveries.
	pub async fn refresh_access_token(&self) -> Result<TokenSecret> {
		let _singleflight = self.refresh_guard.lock().await;

		self.refresh_locked().await
	}

	/// Recovers from a rejected bearer credential observed at `observed_epoch`.
	pub(crate) async fn recover(&self, observed_epoch: u64) -> Result<TokenSecret> {
		let _singleflight = self.refresh_guard.lock().await;

		if let Some(outcome) = self.session.outcome_since(observed_epoch) {
			self.refresh_metrics.record_coalesced();
			obs::debug_refresh_coalesced();

			return outcome.map_err(Error::from);
		}

		self.refresh_locked().await
	}

	async fn refresh_locked(&self) -> Result<TokenSecret> {
		const KIND: CallKind = CallKind::Refresh;

		let span = CallSpan::new(KIND, "refresh_access_token");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let url = resolve_path(&self.config.base_url, &self.config.refresh_path)?;
		let result = span.instrument(self.exchange_refresh_token(url)).await;

		match &result {
			Ok(_) => self.refresh_metrics.record_success(),
			Err(err) => {
				self.session.record_refresh_failure(err.clone());
				self.refresh_metrics.record_failure();
			},
		}

		obs::record_call_result(KIND, &result);

		result.map_err(Error::from)
	}

	async fn exchange_refresh_token(&self, url: Url) -> Result<TokenSecret, RefreshError> {
		self.refresh_metrics.record_attempt();

		let refresh_token =
			self.session.refresh_token().ok_or(RefreshError::MissingRefreshToken)?;
		let body = serde_json::json!({ "refresh_token": refresh_token.expose() });
		let mut outbound = OutboundRequest::new(Method::Post, url);

		outbound.headers.insert(CONTENT_TYPE.into(), JSON_CONTENT_TYPE.into());
		outbound.body = Some(body.to_string().into_bytes());

		let raw = self.transport.send(outbound).await.map_err(RefreshError::network)?;

		if !raw.is_success() {
			return Err(RefreshError::Rejected { status: raw.status, data: raw.data() });
		}

		let mut de = serde_json::Deserializer::from_slice(&raw.body);
		let response: RefreshResponse = serde_path_to_error::deserialize(&mut de)
			.map_err(|e| RefreshError::MalformedResponse { message: e.to_string() })?;

		if response.access_token.is_empty() {
			return Err(RefreshError::MalformedResponse {
				message: "access_token is empty".into(),
			});
		}

		let access_token = TokenSecret::new(response.access_token);
		let rotated = response.refresh_token.filter(|value| !value.is_empty()).map(TokenSecret::new);

		self.session
			.apply_refresh(access_token.clone(), rotated)
			.map_err(RefreshError::Storage)?;

		Ok(access_token)
	}
}
