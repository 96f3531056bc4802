//! Account operations that establish or end a session: login, registration, logout.

// self
use crate::{
	_prelude::*,
	auth::Credentials,
	client::ApiClient,
	http::ApiTransport,
	obs::{self, CallKind, CallOutcome, CallSpan},
	request::{ApiRequest, ApiResponse},
};

/// Registration form accepted by the register endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct Registration {
	/// Desired user name.
	pub username: String,
	/// Plain-text password; hashed server side.
	pub password: String,
	/// Contact e-mail address.
	pub email: String,
}
impl Debug for Registration {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Registration")
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.field("email", &self.email)
			.finish()
	}
}

/// Result of a successful login or registration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedIn {
	/// User name now stored alongside the session.
	pub username: String,
	/// HTTP status returned by the endpoint.
	pub status: u16,
	/// Server-supplied message, if any.
	pub message: Option<String>,
}

#[derive(Deserialize)]
struct SignInResponse {
	access_token: String,
	refresh_token: String,
	#[serde(default)]
	message: Option<String>,
}

#[derive(Serialize)]
struct LoginForm<'a> {
	username: &'a str,
	password: &'a str,
}

impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Exchanges a user name and password for a fresh credential pair.
	pub async fn login(&self, username: &str, password: &str) -> Result<SignedIn> {
		let request = ApiRequest::post(self.config.login_path.as_str())
			.no_auth()
			.with_json(&LoginForm { username, password })?;

		self.sign_in(request, username, "login").await
	}

	/// Creates an account and signs it in.
	pub async fn register(&self, registration: &Registration) -> Result<SignedIn> {
		let request = ApiRequest::post(self.config.register_path.as_str())
			.no_auth()
			.with_json(registration)?;

		self.sign_in(request, &registration.username, "register").await
	}

	/// Drops the access token; the refresh token and user name stay in storage.
	pub fn logout(&self) -> Result<()> {
		self.session.clear_access_token()?;

		Ok(())
	}

	/// Whether the session currently holds an access token.
	pub fn is_logged_in(&self) -> bool {
		self.session.is_authenticated()
	}

	async fn sign_in(
		&self,
		request: ApiRequest,
		username: &str,
		stage: &'static str,
	) -> Result<SignedIn> {
		const KIND: CallKind = CallKind::SignIn;

		let span = CallSpan::new(KIND, stage);

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				let response: ApiResponse = self.request(request).await?;
				let payload: SignInResponse = response.json()?;

				self.session.establish(
					Credentials::new(payload.access_token, payload.refresh_token),
					Some(username),
				)?;

				Ok(SignedIn {
					username: username.to_owned(),
					status: response.status,
					message: payload.message,
				})
			})
			.await;

		obs::record_call_result(KIND, &result);

		result
	}
}
