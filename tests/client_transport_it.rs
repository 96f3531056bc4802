// std
use std::{io, sync::Arc};
// crates.io
use parking_lot::Mutex;
use serde_json::json;
// self
use mealforge_client::{
	auth::{Credentials, Session},
	client::ApiClient,
	config::ClientConfig,
	error::{Error, RefreshError},
	http::{ApiTransport, Method, OutboundRequest, RawResponse, TransportFuture},
	policy::{FailureContext, UnauthorizedStatusPolicy},
	request::{ApiRequest, RequestOptions},
	store::{FileStore, KeyValueStore, MemoryStore, REFRESH_TOKEN_KEY},
};

type Responder = dyn Fn(&OutboundRequest) -> io::Result<RawResponse> + Send + Sync;

/// Transport that answers from a script and records everything it was asked to send.
struct ScriptedTransport {
	sent: Mutex<Vec<OutboundRequest>>,
	respond: Box<Responder>,
}
impl ScriptedTransport {
	fn new(
		respond: impl 'static + Fn(&OutboundRequest) -> io::Result<RawResponse> + Send + Sync,
	) -> Self {
		Self { sent: Mutex::new(Vec::new()), respond: Box::new(respond) }
	}

	fn sent(&self) -> Vec<OutboundRequest> {
		self.sent.lock().clone()
	}
}
impl ApiTransport for ScriptedTransport {
	type TransportError = io::Error;

	fn send(&self, request: OutboundRequest) -> TransportFuture<'_, Self::TransportError> {
		let response = (self.respond)(&request);

		self.sent.lock().push(request);

		Box::pin(async move { response })
	}
}

fn config() -> ClientConfig {
	ClientConfig::from_base("http://localhost:8000/api").expect("Config fixture should build.")
}

fn seeded_session(access: &str, refresh: &str) -> (Arc<Session>, MemoryStore) {
	let store = MemoryStore::default();
	let session =
		Session::restore(Arc::new(store.clone())).expect("Empty store should restore cleanly.");

	session
		.establish(Credentials::new(access, refresh), Some("chef"))
		.expect("Seeding credentials should succeed.");

	(Arc::new(session), store)
}

fn scripted_client(
	session: Arc<Session>,
	respond: impl 'static + Fn(&OutboundRequest) -> io::Result<RawResponse> + Send + Sync,
) -> ApiClient<ScriptedTransport> {
	ApiClient::with_transport(config(), session, ScriptedTransport::new(respond))
}

fn is_refresh(request: &OutboundRequest) -> bool {
	request.url.path() == "/api/refresh_token/"
}

fn bearer_is(request: &OutboundRequest, token: &str) -> bool {
	request.authorization() == Some(format!("Bearer {token}").as_str())
}

#[tokio::test]
async fn bearer_header_matches_the_held_token() {
	let (session, _store) = seeded_session("token", "refresh");
	let client = scripted_client(session, |_| Ok(RawResponse::json(200, &json!([]))));

	client
		.get("search/recipes", &[("query", "pasta")], RequestOptions::default())
		.await
		.expect("Search should succeed.");

	let sent = client.transport.sent();

	assert_eq!(sent.len(), 1);
	assert_eq!(sent[0].method, Method::Get);
	assert_eq!(sent[0].url.as_str(), "http://localhost:8000/api/search/recipes?query=pasta");
	assert_eq!(sent[0].authorization(), Some("Bearer token"));
}

#[tokio::test]
async fn anonymous_calls_never_carry_or_refresh_credentials() {
	let (session, _store) = seeded_session("token", "refresh");
	let client = scripted_client(session, |_| Ok(RawResponse::new(401, "")));
	let err = client
		.get("ingredients/5", &[], RequestOptions::anonymous())
		.await
		.expect_err("A 401 on an anonymous call should be returned unchanged.");
	let sent = client.transport.sent();

	assert_eq!(err.status(), Some(401));
	assert_eq!(sent.len(), 1);
	assert_eq!(sent[0].authorization(), None);
	assert_eq!(client.refresh_metrics.attempts(), 0);
}

#[tokio::test]
async fn forged_authorization_headers_never_reach_the_transport() {
	let (session, _store) = seeded_session("held", "refresh");
	let client = scripted_client(session, |_| Ok(RawResponse::json(200, &json!({}))));
	let mut anonymous = ApiRequest::get("ingredients/5").no_auth();
	let mut authenticated = ApiRequest::get("preferences/");

	anonymous.headers.insert("Authorization".into(), "Bearer forged".into());
	authenticated.headers.insert("Authorization".into(), "Bearer forged".into());
	authenticated.headers.insert("X-Request-Id".into(), "abc".into());

	client.request(anonymous).await.expect("The anonymous call should succeed.");
	client.request(authenticated).await.expect("The authenticated call should succeed.");

	let sent = client.transport.sent();
	let authorization_headers = |request: &OutboundRequest| {
		request
			.headers
			.keys()
			.filter(|name| name.eq_ignore_ascii_case("authorization"))
			.count()
	};

	assert_eq!(sent.len(), 2);
	assert_eq!(authorization_headers(&sent[0]), 0);
	assert_eq!(authorization_headers(&sent[1]), 1);
	assert_eq!(sent[1].authorization(), Some("Bearer held"));
	assert!(sent[1].headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn token_written_through_the_session_is_the_next_bearer() {
	let (session, _store) = seeded_session("old", "refresh");
	let client = scripted_client(session, |_| Ok(RawResponse::json(200, &json!([]))));

	client.session.set_access_token("x").expect("Writing the access token should succeed.");
	client.request(ApiRequest::get("user/recipes/")).await.expect("The request should succeed.");

	let sent = client.transport.sent();

	assert_eq!(sent.len(), 1);
	assert_eq!(sent[0].authorization(), Some("Bearer x"));
}

#[tokio::test]
async fn non_auth_failures_are_not_retried() {
	let (session, _store) = seeded_session("token", "refresh");
	let client = scripted_client(session, |_| {
		Ok(RawResponse::json(500, &json!({ "message": "Database unavailable" })))
	});
	let err = client
		.request(ApiRequest::get("preferences/"))
		.await
		.expect_err("A plain 500 should surface.");

	assert_eq!(client.transport.sent().len(), 1);

	let Error::Api(api) = err else { panic!("Expected an API error.") };

	assert_eq!(api.status, 500);
	assert_eq!(api.message(), Some("Database unavailable"));
}

#[tokio::test]
async fn refresh_request_is_anonymous_and_rotation_is_persisted() {
	let (session, store) = seeded_session("old", "refresh-1");
	let client = scripted_client(session, |request| {
		if is_refresh(request) {
			return Ok(RawResponse::json(
				200,
				&json!({ "access_token": "new", "refresh_token": "refresh-2" }),
			));
		}
		if bearer_is(request, "new") {
			return Ok(RawResponse::json(200, &json!({ "diet": "vegan" })));
		}

		Ok(RawResponse::new(401, ""))
	});
	let response = client
		.request(ApiRequest::get("preferences/"))
		.await
		.expect("The request should recover after a refresh.");
	let sent = client.transport.sent();

	assert_eq!(response.data, json!({ "diet": "vegan" }));
	assert_eq!(sent.len(), 3);
	assert!(bearer_is(&sent[0], "old"));
	assert!(is_refresh(&sent[1]));
	assert_eq!(sent[1].method, Method::Post);
	assert_eq!(sent[1].authorization(), None);
	assert_eq!(sent[1].json_body(), Some(json!({ "refresh_token": "refresh-1" })));
	assert!(bearer_is(&sent[2], "new"));
	assert_eq!(
		store.get(REFRESH_TOKEN_KEY).expect("Store read should succeed."),
		Some("refresh-2".into())
	);
}

#[tokio::test]
async fn replay_keeps_method_body_and_headers() {
	let (session, _store) = seeded_session("old", "refresh-1");
	let client = scripted_client(session, |request| {
		if is_refresh(request) {
			return Ok(RawResponse::json(200, &json!({ "access_token": "new" })));
		}
		if bearer_is(request, "new") {
			return Ok(RawResponse::new(204, ""));
		}

		Ok(RawResponse::new(401, ""))
	});
	let request = ApiRequest::put("user/shopping-lists/3")
		.header("X-Request-Id", "abc")
		.json(json!({ "items": ["flour", "eggs"] }));
	let response = client.request(request).await.expect("The replay should succeed.");
	let sent = client.transport.sent();

	assert_eq!(response.status, 204);
	assert_eq!(response.data, serde_json::Value::Null);
	assert_eq!(sent.len(), 3);
	assert_eq!(sent[0].method, sent[2].method);
	assert_eq!(sent[0].url, sent[2].url);
	assert_eq!(sent[0].body, sent[2].body);
	assert_eq!(sent[2].header("x-request-id"), Some("abc"));
}

#[tokio::test]
async fn missing_refresh_token_fails_without_a_refresh_call() {
	let store = MemoryStore::with_entries([("accessToken", "orphan")]);
	let session = Arc::new(
		Session::restore(Arc::new(store.clone())).expect("Seeded store should restore cleanly."),
	);
	let client = scripted_client(session, |_| Ok(RawResponse::new(401, "")));
	let err = client
		.request(ApiRequest::get("user/recipes/"))
		.await
		.expect_err("Without a refresh token the session cannot recover.");

	assert!(matches!(err, Error::Refresh(RefreshError::MissingRefreshToken)));
	assert_eq!(client.transport.sent().len(), 1);
	assert_eq!(client.refresh_metrics.failures(), 1);
}

#[tokio::test]
async fn strict_policy_ignores_the_gateway_marker() {
	let (session, _store) = seeded_session("old", "refresh-1");
	let client = scripted_client(session, |_| {
		Ok(RawResponse::json(500, &json!({ "message": "401 Client Error: Unauthorized" })))
	})
	.with_policy(UnauthorizedStatusPolicy);
	let err = client
		.request(ApiRequest::get("preferences/"))
		.await
		.expect_err("The strict policy should not refresh on a 500.");

	assert_eq!(err.status(), Some(500));
	assert_eq!(client.transport.sent().len(), 1);
}

#[tokio::test]
async fn closure_policies_drive_the_refresh() {
	let (session, _store) = seeded_session("old", "refresh-1");
	let client = scripted_client(session, |request| {
		if is_refresh(request) {
			return Ok(RawResponse::json(200, &json!({ "access_token": "new" })));
		}
		if bearer_is(request, "new") {
			return Ok(RawResponse::json(200, &json!([])));
		}

		Ok(RawResponse::new(419, "Session expired"))
	})
	.with_policy(|ctx: &FailureContext| ctx.status == 419);

	client
		.request(ApiRequest::get("user/recipes/"))
		.await
		.expect("A 419 should be treated as an auth failure by the custom policy.");

	assert_eq!(client.transport.sent().len(), 3);
	assert_eq!(client.refresh_metrics.successes(), 1);
}

#[tokio::test]
async fn transport_failures_surface_without_retry() {
	let (session, _store) = seeded_session("token", "refresh");
	let client = scripted_client(session, |_| {
		Err(io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"))
	});
	let err = client
		.request(ApiRequest::get("user/recipes/"))
		.await
		.expect_err("A refused connection should fail.");

	assert!(matches!(err, Error::Transport(_)));
	assert_eq!(err.status(), None);
	assert_eq!(client.transport.sent().len(), 1);
}

#[tokio::test]
async fn refresh_network_failure_ends_the_session() {
	let (session, _store) = seeded_session("old", "refresh-1");
	let client = scripted_client(session, |request| {
		if is_refresh(request) {
			return Err(io::Error::new(io::ErrorKind::TimedOut, "timed out"));
		}

		Ok(RawResponse::new(401, ""))
	});
	let err = client
		.request(ApiRequest::get("user/recipes/"))
		.await
		.expect_err("A failed refresh exchange should end the session.");

	assert!(matches!(err, Error::Refresh(RefreshError::Network { .. })));
	assert!(err.is_session_ended());
	assert_eq!(client.transport.sent().len(), 2);
}

#[tokio::test]
async fn malformed_refresh_body_is_reported() {
	let (session, _store) = seeded_session("old", "refresh-1");
	let client = scripted_client(session, |request| {
		if is_refresh(request) {
			return Ok(RawResponse::json(200, &json!({ "token": "new" })));
		}

		Ok(RawResponse::new(401, ""))
	});
	let err = client
		.refresh_access_token()
		.await
		.expect_err("A refresh body without access_token should be rejected.");

	assert!(matches!(err, Error::Refresh(RefreshError::MalformedResponse { .. })));
	assert_eq!(client.session.access_token().map(|t| t.expose().to_owned()), Some("old".into()));
}

#[tokio::test]
async fn refreshed_tokens_survive_a_restart_with_a_file_store() {
	let path = std::env::temp_dir().join(format!(
		"mealforge-client-it-{}-{}.json",
		std::process::id(),
		time::OffsetDateTime::now_utc().unix_timestamp_nanos()
	));
	let store = FileStore::open(&path).expect("File store should open.");
	let session = Session::restore(Arc::new(store)).expect("Empty file store should restore.");

	session
		.establish(Credentials::new("old", "refresh-1"), Some("chef"))
		.expect("Seeding credentials should succeed.");

	let client = scripted_client(Arc::new(session), |request| {
		if is_refresh(request) {
			return Ok(RawResponse::json(200, &json!({ "access_token": "new" })));
		}

		Ok(RawResponse::json(200, &json!({})))
	});

	client.refresh_access_token().await.expect("Forced refresh should succeed.");

	let reopened = FileStore::open(&path).expect("File store should reopen.");
	let restored = Session::restore(Arc::new(reopened)).expect("Persisted session should restore.");

	assert_eq!(restored.access_token().map(|t| t.expose().to_owned()), Some("new".into()));
	assert_eq!(restored.refresh_token().map(|t| t.expose().to_owned()), Some("refresh-1".into()));
	assert_eq!(restored.username().as_deref(), Some("chef"));

	let _ = std::fs::remove_file(&path);
}
