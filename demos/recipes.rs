//! Walks a MealForge session end to end against a local mock server: login, an authenticated
//! call that hits the gateway's wrapped 401, the transparent refresh, and logout.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use mealforge_client::{
	auth::Session,
	client::ReqwestApiClient,
	request::RequestOptions,
	store::{KeyValueStore, MemoryStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/login/");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"stale-access\",\"refresh_token\":\"demo-refresh\",\"message\":\"Welcome back\"}",
			);
		})
		.await;
	let stale_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/user/recipes/").header("authorization", "Bearer stale-access");
			then.status(500).header("content-type", "application/json").body(
				"{\"message\":\"401 Client Error: Unauthorized for url: http://user-service/user/recipes/\"}",
			);
		})
		.await;
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/refresh_token/");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"fresh-access\"}");
		})
		.await;
	let recipes_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/user/recipes/").header("authorization", "Bearer fresh-access");
			then.status(200)
				.header("content-type", "application/json")
				.body("[{\"id\":7,\"title\":\"Shakshuka\"}]");
		})
		.await;
	let store = MemoryStore::default();
	let backend: Arc<dyn KeyValueStore> = Arc::new(store.clone());
	let session = Arc::new(Session::restore(backend)?);
	let client = ReqwestApiClient::from_base(&server.url("/api"), session)?;
	let signed_in = client.login("chef", "hunter2").await?;

	println!("Signed in as {} ({:?}).", signed_in.username, signed_in.message);

	let recipes = client.get("user/recipes/", &[], RequestOptions::default()).await?;

	println!("Saved recipes: {}.", recipes.data);
	println!("Stored access token after refresh: {:?}.", store.get("accessToken")?);

	client.logout()?;

	println!("Logged in after logout: {}.", client.is_logged_in());

	login_mock.assert_async().await;
	stale_mock.assert_async().await;
	refresh_mock.assert_async().await;
	recipes_mock.assert_async().await;

	Ok(())
}
