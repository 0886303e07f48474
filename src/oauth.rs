//! OAuth 2.0 grants against the discovered UAA endpoints.
//!
//! Token mechanics are delegated to the `oauth2` crate; this module configures the client for
//! the Cloud Foundry conventions (client id `cf` with an empty secret, `/oauth/auth` and
//! `/oauth/token` suffixes) and maps its failures into [`AuthenticationError`].

pub use oauth2;

// crates.io
use oauth2::{
	AuthUrl, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError, RefreshToken,
	RequestTokenError, ResourceOwnerPassword, ResourceOwnerUsername, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	discovery::Endpoints,
	error::{AuthenticationError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	obs::{self, FlowKind},
	token::{Token, TokenSource},
};

/// OAuth client identifier used by Cloud Foundry command line clients.
pub const CLIENT_ID: &str = "cf";
/// Path appended to the authorization endpoint.
pub const AUTH_PATH: &str = "/oauth/auth";
/// Path appended to the token endpoint.
pub const TOKEN_PATH: &str = "/oauth/token";

type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Performs the password grant and returns a token source seeded with the issued token.
pub async fn exchange<C>(
	endpoints: &Endpoints,
	username: &str,
	password: &str,
	http_client: impl Into<Arc<C>>,
) -> Result<TokenSource<C>>
where
	C: ?Sized + TokenHttpClient,
{
	let facade = PasswordGrant::from_endpoints(endpoints, http_client)?;
	let token = facade.exchange_password(username, password).await?;

	Ok(TokenSource::new(facade, token))
}

/// `oauth2` client bound to a transport, able to run the password and refresh grants.
pub struct PasswordGrant<C>
where
	C: ?Sized + TokenHttpClient,
{
	oauth_client: ConfiguredBasicClient,
	http_client: Arc<C>,
}
impl<C> PasswordGrant<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Configures the grant from discovered endpoints.
	pub fn from_endpoints(
		endpoints: &Endpoints,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self, AuthenticationError> {
		let auth_url = AuthUrl::new(format!("{}{AUTH_PATH}", endpoints.authorization))
			.map_err(|source| AuthenticationError::InvalidEndpoint { endpoint: "authorization", source })?;
		let token_url = TokenUrl::new(format!("{}{TOKEN_PATH}", endpoints.token))
			.map_err(|source| AuthenticationError::InvalidEndpoint { endpoint: "token", source })?;
		// UAA authenticates the public `cf` client through HTTP Basic with an empty secret.
		let oauth_client = BasicClient::new(ClientId::new(CLIENT_ID.to_owned()))
			.set_client_secret(ClientSecret::new(String::new()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url);

		Ok(Self { oauth_client, http_client: http_client.into() })
	}

	/// Token URL the grants are sent to.
	pub fn token_url(&self) -> &str {
		self.oauth_client.token_uri().as_str()
	}

	/// Exchanges resource owner credentials for a token.
	pub async fn exchange_password(
		&self,
		username: &str,
		password: &str,
	) -> Result<Token, AuthenticationError> {
		const GRANT: &str = "password";

		obs::observe(FlowKind::PasswordGrant, "exchange_password", async {
			let meta = ResponseMetadataSlot::default();
			let instrumented = self.http_client.with_metadata(meta.clone());
			let username = ResourceOwnerUsername::new(username.to_owned());
			let password = ResourceOwnerPassword::new(password.to_owned());

			self.oauth_client
				.exchange_password(&username, &password)
				.request_async(&instrumented)
				.await
				.map(|response| map_token_response(response, None))
				.map_err(|err| map_request_error(GRANT, meta.take(), err))
		})
		.await
	}

	/// Trades a refresh token for a new token.
	///
	/// When the provider does not rotate the refresh token, `refresh_token` is carried over.
	pub async fn refresh(&self, refresh_token: &str) -> Result<Token, AuthenticationError> {
		const GRANT: &str = "refresh_token";

		obs::observe(FlowKind::Refresh, "refresh", async {
			let meta = ResponseMetadataSlot::default();
			let instrumented = self.http_client.with_metadata(meta.clone());
			let secret = RefreshToken::new(refresh_token.to_owned());

			self.oauth_client
				.exchange_refresh_token(&secret)
				.request_async(&instrumented)
				.await
				.map(|response| map_token_response(response, Some(refresh_token)))
				.map_err(|err| map_request_error(GRANT, meta.take(), err))
		})
		.await
	}
}
impl<C> Debug for PasswordGrant<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PasswordGrant")
			.field("client_id", &CLIENT_ID)
			.field("token_url", &self.token_url())
			.finish()
	}
}

fn map_token_response(response: BasicTokenResponse, previous_refresh: Option<&str>) -> Token {
	let expires_at = response
		.expires_in()
		.and_then(|lifetime| Duration::try_from(lifetime).ok())
		.map(|lifetime| OffsetDateTime::now_utc() + lifetime);
	let refresh_token = response
		.refresh_token()
		.map(|secret| secret.secret().as_str())
		.or(previous_refresh)
		.filter(|secret| !secret.is_empty());

	Token::new(response.access_token().secret().as_str(), refresh_token, expires_at)
}

fn map_request_error<E>(
	grant: &'static str,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
) -> AuthenticationError
where
	E: 'static + Send + Sync + StdError,
{
	let status = meta.and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => {
			let reason = match response.error_description() {
				Some(description) => format!("{}: {description}", response.error().as_ref()),
				None => response.error().as_ref().to_owned(),
			};

			AuthenticationError::Rejected { grant, reason, status }
		},
		RequestTokenError::Request(error) => map_transport_error(error, status),
		RequestTokenError::Parse(source, _body) =>
			AuthenticationError::MalformedResponse { source, status },
		RequestTokenError::Other(message) =>
			AuthenticationError::UnexpectedResponse { message, status },
	}
}

fn map_transport_error<E>(err: HttpClientError<E>, status: Option<u16>) -> AuthenticationError
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) => TransportError::Network { source: inner }.into(),
		HttpClientError::Http(inner) => inner.into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => AuthenticationError::UnexpectedResponse { message, status },
		other => AuthenticationError::UnexpectedResponse { message: other.to_string(), status },
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::http::ReqwestHttpClient;

	fn endpoints(base: &str) -> Endpoints {
		Endpoints {
			authorization: base.into(),
			token: base.into(),
			..Endpoints::fallback()
		}
	}

	#[test]
	fn appends_uaa_paths() {
		let grant = <PasswordGrant<ReqwestHttpClient>>::from_endpoints(
			&endpoints("https://uaa.example.com"),
			ReqwestHttpClient::default(),
		)
		.expect("Grant should build from valid endpoints.");

		assert_eq!(grant.token_url(), "https://uaa.example.com/oauth/token");
		assert_eq!(grant.oauth_client.auth_uri().as_str(), "https://uaa.example.com/oauth/auth");
		assert_eq!(grant.oauth_client.client_id().as_str(), CLIENT_ID);
	}

	#[test]
	fn missing_token_endpoint_is_rejected() {
		let err = <PasswordGrant<ReqwestHttpClient>>::from_endpoints(
			&Endpoints { token: String::new(), ..Endpoints::fallback() },
			ReqwestHttpClient::default(),
		)
		.expect_err("An empty token endpoint cannot form a URL.");

		assert!(matches!(err, AuthenticationError::InvalidEndpoint { endpoint: "token", .. }));
	}

	#[test]
	fn other_transport_failures_keep_status() {
		let err = map_transport_error::<std::io::Error>(HttpClientError::Other("boom".into()), Some(502));

		assert!(matches!(err, AuthenticationError::UnexpectedResponse { status: Some(502), .. }));
	}
}
