// std
use std::collections::BTreeMap;
// crates.io
use httpmock::prelude::*;
// self
use cf_client::{
	_preludet::*,
	client::{Client, Config},
	error::{AuthenticationError, DiscoveryError},
	reqwest::{Method, StatusCode},
};

const MALFORMED_CA: &str = "-----BEGIN CERTIFICATE-----\nnot base64 at all\n-----END CERTIFICATE-----\n";

fn http_base(server: &MockServer) -> String {
	format!("http://{}", server.address())
}

fn https_base(server: &MockServer) -> String {
	format!("https://{}", server.address())
}

async fn mount_info<'a>(server: &'a MockServer, base: &str) -> httpmock::Mock<'a> {
	let body = info_document(base);

	server
		.mock_async(move |when, then| {
			when.method(GET).path("/v2/info");
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await
}

async fn mount_token(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			// Basic credentials for `cf:`, the public client id with an empty secret.
			when.method(POST).path("/oauth/token").header("authorization", "Basic Y2Y6");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_document(TEST_ACCESS_TOKEN, Some(TEST_REFRESH_TOKEN), 3600));
		})
		.await
}

#[tokio::test]
async fn make_request_carries_bearer_token() {
	let server = MockServer::start_async().await;
	let info = mount_info(&server, &http_base(&server)).await;
	let token = mount_token(&server).await;
	let foobar = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/foobar").header("authorization", "Bearer foobar2");
			then.status(200).header("content-type", "application/json").body("{\"resources\":[]}");
		})
		.await;
	let client = Client::new(test_config(&http_base(&server)).with_skip_ssl_validation(true))
		.await
		.expect("Client construction against the mock API should succeed.");
	let response = client
		.do_request(client.new_request(Method::GET, "/v2/foobar"))
		.await
		.expect("Authenticated request should succeed.");

	assert_eq!(response.status(), StatusCode::OK);

	info.assert_async().await;
	token.assert_async().await;
	foobar.assert_calls_async(1).await;
}

#[tokio::test]
async fn construction_exposes_discovered_endpoints_and_defaults() {
	let server = MockServer::start_async().await;
	let _info = mount_info(&server, &http_base(&server)).await;
	let _token = mount_token(&server).await;
	let client = Client::new(Config::new(http_base(&server)))
		.await
		.expect("Client construction with default credentials should succeed.");

	assert_eq!(client.config().username, Config::DEFAULT_USERNAME);
	assert_eq!(client.config().password, Config::DEFAULT_PASSWORD);
	assert_eq!(client.config().token, "");
	assert_eq!(client.endpoints().authorization, http_base(&server));
	assert_eq!(client.endpoints().token, http_base(&server));
	assert_eq!(client.endpoints().doppler, "wss://doppler.mock.example.com:443");
	assert_eq!(client.endpoints().logging, "wss://loggregator.mock.example.com:443");
}

#[tokio::test]
async fn token_is_stable_within_validity_window() {
	let server = MockServer::start_async().await;
	let _info = mount_info(&server, &http_base(&server)).await;
	let token_mock = mount_token(&server).await;
	let client = Client::new(test_config(&http_base(&server)))
		.await
		.expect("Client construction should succeed.");
	let first = client.token().await.expect("Cached token should be returned.");
	let second = client.clone().token().await.expect("Cached token should be returned again.");

	assert_eq!(first, "bearer foobar2");
	assert_eq!(second, first);

	token_mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn pinned_ca_trusts_matching_server() {
	let server = MockServer::start_async().await;
	let base = https_base(&server);
	let info = mount_info(&server, &base).await;
	let token = mount_token(&server).await;
	let foobar = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/foobar").header("authorization", "Bearer foobar2");
			then.status(200);
		})
		.await;
	let client = Client::new(test_config(&base).with_ca_pem(include_str!("fixtures/httpmock_ca.pem")))
		.await
		.expect("Client pinned to the server's CA should construct over TLS.");
	let response = client
		.do_request(client.new_request(Method::GET, "/v2/foobar"))
		.await
		.expect("Request through the pinned transport should succeed.");

	assert_eq!(response.status(), StatusCode::OK);

	info.assert_async().await;
	token.assert_async().await;
	foobar.assert_async().await;
}

#[tokio::test]
async fn pinned_ca_rejects_foreign_server() {
	let server = MockServer::start_async().await;
	let base = https_base(&server);
	let _info = mount_info(&server, &base).await;
	let token = mount_token(&server).await;
	let err = Client::new(test_config(&base).with_ca_pem(include_str!("fixtures/ca.pem")))
		.await
		.expect_err("A server certificate outside the pinned CA must be rejected.");

	match err {
		Error::Configuration { source: DiscoveryError::Request { url, .. } } =>
			assert_eq!(url, format!("{base}/v2/info")),
		other => panic!("Unexpected error variant: {other:?}."),
	}

	token.assert_calls_async(0).await;
}

#[tokio::test]
async fn strict_validation_rejects_untrusted_server() {
	let server = MockServer::start_async().await;
	let base = https_base(&server);
	let _info = mount_info(&server, &base).await;
	let err = Client::new(test_config(&base))
		.await
		.expect_err("The mock server's CA is not a bundled root.");

	assert!(matches!(err, Error::Configuration { source: DiscoveryError::Request { .. } }));
}

#[tokio::test]
async fn malformed_ca_fails_before_any_request() {
	let server = MockServer::start_async().await;
	let info = mount_info(&server, &http_base(&server)).await;
	let err = Client::new(test_config(&http_base(&server)).with_ca_pem(MALFORMED_CA))
		.await
		.expect_err("Malformed CA material must abort construction.");

	assert!(matches!(err, Error::InvalidCertificate(_)));

	info.assert_calls_async(0).await;
}

#[tokio::test]
async fn skip_validation_accepts_untrusted_server() {
	let server = MockServer::start_async().await;
	let base = https_base(&server);
	let info = mount_info(&server, &base).await;
	let token = mount_token(&server).await;
	let client = Client::new(test_config(&base).with_skip_ssl_validation(true))
		.await
		.expect("Skipping validation should accept the mock server's certificate.");

	assert_eq!(client.endpoints().token, base);

	info.assert_async().await;
	token.assert_async().await;
}

#[tokio::test]
async fn skip_validation_ignores_malformed_ca() {
	let server = MockServer::start_async().await;
	let base = https_base(&server);
	let _info = mount_info(&server, &base).await;
	let _token = mount_token(&server).await;

	Client::new(test_config(&base).with_skip_ssl_validation(true).with_ca_pem(MALFORMED_CA))
		.await
		.expect("Skipping validation wins over the supplied CA.");
}

#[tokio::test]
async fn discovery_failure_is_a_configuration_error() {
	let server = MockServer::start_async().await;
	let info = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/info");
			then.status(503).body("maintenance");
		})
		.await;
	let token = mount_token(&server).await;
	let err = Client::new(test_config(&http_base(&server)))
		.await
		.expect_err("Discovery failures must abort construction.");

	match err {
		Error::Configuration { source: DiscoveryError::UnexpectedStatus { status, url } } => {
			assert_eq!(status, 503);
			assert_eq!(url, format!("{}/v2/info", http_base(&server)));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	info.assert_async().await;
	token.assert_calls_async(0).await;
}

#[tokio::test]
async fn rejected_credentials_abort_construction() {
	let server = MockServer::start_async().await;
	let _info = mount_info(&server, &http_base(&server)).await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(401).header("content-type", "application/json").body(
				"{\"error\":\"unauthorized\",\"error_description\":\"Bad credentials\"}",
			);
		})
		.await;
	let err = Client::new(test_config(&http_base(&server)))
		.await
		.expect_err("Rejected credentials must abort construction.");

	match err {
		Error::Authentication(AuthenticationError::Rejected { grant, reason, status }) => {
			assert_eq!(grant, "password");
			assert_eq!(reason, "unauthorized: Bad credentials");
			assert_eq!(status, Some(401));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	token.assert_async().await;
}

#[tokio::test]
async fn request_failures_do_not_poison_the_client() {
	let server = MockServer::start_async().await;
	let _info = mount_info(&server, &http_base(&server)).await;
	let _token = mount_token(&server).await;
	let apps = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v2/apps")
				.query_param("async", "true")
				.header("content-type", "application/json")
				.header("authorization", "Bearer foobar2");
			then.status(201).body("{}");
		})
		.await;
	let client = Client::new(test_config(&http_base(&server)))
		.await
		.expect("Client construction should succeed.");
	let unencodable = BTreeMap::from([((1, 2), "tuple keys")]);
	let err = client
		.do_request(client.new_request(Method::POST, "/v2/apps").json(&unencodable))
		.await
		.expect_err("Objects with tuple keys cannot be encoded.");

	assert!(matches!(err, Error::Serialization { .. }));

	let response = client
		.do_request(
			client
				.new_request(Method::POST, "/v2/apps")
				.param("async", "true")
				.json(&serde_json::json!({ "name": "my-app" })),
		)
		.await
		.expect("The client should stay usable after a failed request.");

	assert_eq!(response.status(), StatusCode::CREATED);

	apps.assert_calls_async(1).await;
}

#[tokio::test]
async fn raw_body_requests_bypass_json_encoding() {
	let server = MockServer::start_async().await;
	let _info = mount_info(&server, &http_base(&server)).await;
	let _token = mount_token(&server).await;
	let bits = server
		.mock_async(|when, then| {
			when.method(PUT).path("/v2/apps/guid/bits").body("raw-bits");
			then.status(201);
		})
		.await;
	let client = Client::new(test_config(&http_base(&server)))
		.await
		.expect("Client construction should succeed.");
	let response = client
		.do_request(client.new_request_with_body(Method::PUT, "/v2/apps/guid/bits", "raw-bits"))
		.await
		.expect("Raw body upload should succeed.");

	assert_eq!(response.status(), StatusCode::CREATED);

	bits.assert_async().await;
}
