//! Client facade: bootstrap sequence and the authenticated request path.

pub mod config;
pub mod request;

pub use config::Config;
pub use request::PendingRequest;

// crates.io
use reqwest::{Body, Method, Response};
// self
use crate::{
	_prelude::*,
	discovery::{self, Endpoints},
	http::{AuthorizedHttpClient, ReqwestHttpClient},
	oauth,
	obs::{self, FlowKind},
	token::TokenProvider,
	transport::{self, TlsPolicy},
};

/// Authenticated client for a Cloud Foundry style control API.
///
/// Configuration and endpoints are fixed once [`Client::new`] returns. Clones share the same
/// token source, so a refresh performed through one clone is visible to all of them.
#[derive(Clone)]
pub struct Client {
	config: Config,
	endpoints: Endpoints,
	http_client: AuthorizedHttpClient,
	tokens: Arc<dyn TokenProvider>,
}
impl Client {
	/// Runs the bootstrap sequence and returns a ready client.
	///
	/// Empty configuration fields take their defaults, then the transport is built for the
	/// configured [`TlsPolicy`], endpoints are discovered, and the credentials are exchanged for
	/// a token. Any failure aborts construction.
	pub async fn new(config: Config) -> Result<Self> {
		let config = config.with_defaults();
		let policy = TlsPolicy::from_config(config.skip_ssl_validation, &config.ca_pem);
		let base = transport::build(&policy, config.http_client.as_ref())?;
		let endpoints = discovery::discover(&config.api_address, &base)
			.await
			.map_err(|source| Error::Configuration { source })?;
		let source = oauth::exchange::<ReqwestHttpClient>(
			&endpoints,
			&config.username,
			&config.password,
			ReqwestHttpClient::with_client(base.clone()),
		)
		.await?;
		let tokens: Arc<dyn TokenProvider> = Arc::new(source);
		let http_client = AuthorizedHttpClient::new(base, Arc::clone(&tokens));

		Ok(Self { config, endpoints, http_client, tokens })
	}

	/// Effective configuration, with defaults applied.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Endpoints discovered during construction.
	pub fn endpoints(&self) -> &Endpoints {
		&self.endpoints
	}

	/// Token source backing the client's requests.
	pub fn token_provider(&self) -> &Arc<dyn TokenProvider> {
		&self.tokens
	}

	/// Starts a request to `{api_address}{path}` with no parameters and no body.
	pub fn new_request(&self, method: Method, path: &str) -> PendingRequest {
		PendingRequest::new(method, format!("{}{path}", self.config.api_address))
	}

	/// Starts a request carrying a raw `body`, bypassing JSON encoding.
	pub fn new_request_with_body(&self, method: Method, path: &str, body: impl Into<Body>) -> PendingRequest {
		self.new_request(method, path).with_body(body.into())
	}

	/// Sends `request` through the authenticated sender.
	///
	/// The response body is not read; the caller owns it.
	pub async fn do_request(&self, request: PendingRequest) -> Result<Response> {
		obs::observe(FlowKind::Request, "do_request", async {
			let request = request.into_request(self.http_client.inner())?;

			self.http_client.execute(request).await
		})
		.await
	}

	/// Returns the current `Authorization` value, `bearer <access token>`, refreshing first if
	/// the cached token expired.
	pub async fn token(&self) -> Result<String> {
		let token = self.tokens.current_token().await?;

		Ok(token.bearer())
	}
}
impl Debug for Client {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("config", &self.config)
			.field("endpoints", &self.endpoints)
			.finish_non_exhaustive()
	}
}
