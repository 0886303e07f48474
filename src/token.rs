//! Access token model and the refreshing token source shared by a client.
//!
//! [`TokenSource`] caches the token issued by the password grant and refreshes it reactively:
//! the first read after the token enters its expiry window runs the `refresh_token` grant.
//! Refreshes are serialized by an async guard, so concurrent callers never stampede the token
//! endpoint and always observe either the previous or the refreshed token.

pub mod metrics;
pub mod secret;

pub use metrics::RefreshMetrics;
pub use secret::TokenSecret;

// self
use crate::{
	_prelude::*,
	error::TokenError,
	http::TokenHttpClient,
	oauth::PasswordGrant,
};

/// Boxed future returned by [`TokenProvider::current_token`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<TokenSecret, TokenError>> + 'a + Send>>;

/// Source of currently valid access tokens.
pub trait TokenProvider
where
	Self: Send + Sync,
{
	/// Returns a valid access token, refreshing it first when needed.
	fn current_token(&self) -> TokenFuture<'_>;
}

/// Token issued by the token endpoint.
#[derive(Clone)]
pub struct Token {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh token secret, if the provider issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Expiry instant; `None` means the token does not expire.
	pub expires_at: Option<OffsetDateTime>,
}
impl Token {
	/// Creates a token from raw secrets.
	pub fn new(
		access_token: impl Into<String>,
		refresh_token: Option<&str>,
		expires_at: Option<OffsetDateTime>,
	) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: refresh_token.map(TokenSecret::new),
			expires_at,
		}
	}

	/// Returns `true` when the token is still usable at `now`, keeping `delta` of headroom.
	pub fn is_valid_at(&self, now: OffsetDateTime, delta: Duration) -> bool {
		match self.expires_at {
			Some(expires_at) => now + delta < expires_at,
			None => true,
		}
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Reactive, refresh-on-read token source bound to one grant configuration.
pub struct TokenSource<C>
where
	C: ?Sized + TokenHttpClient,
{
	grant: PasswordGrant<C>,
	cached: RwLock<Token>,
	refresh_guard: AsyncMutex<()>,
	expiry_delta: Duration,
	metrics: RefreshMetrics,
}
impl<C> TokenSource<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Headroom before the expiry instant at which a token is treated as expired.
	pub const DEFAULT_EXPIRY_DELTA: Duration = Duration::seconds(10);

	/// Creates a source seeded with `token`.
	pub fn new(grant: PasswordGrant<C>, token: Token) -> Self {
		Self {
			grant,
			cached: RwLock::new(token),
			refresh_guard: AsyncMutex::new(()),
			expiry_delta: Self::DEFAULT_EXPIRY_DELTA,
			metrics: RefreshMetrics::default(),
		}
	}

	/// Overrides the expiry headroom (defaults to 10 seconds). Negative values count as zero.
	pub fn with_expiry_delta(mut self, delta: Duration) -> Self {
		self.expiry_delta = if delta.is_negative() { Duration::ZERO } else { delta };

		self
	}

	/// Returns a snapshot of the cached token.
	pub fn cached(&self) -> Token {
		self.cached.read().clone()
	}

	/// Returns the refresh counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Returns a valid token, refreshing it when it entered the expiry window.
	pub async fn token(&self) -> Result<Token, TokenError> {
		if let Some(token) = self.valid_cached() {
			return Ok(token);
		}

		let _refreshing = self.refresh_guard.lock().await;

		// Another caller may have refreshed while this one waited for the guard.
		if let Some(token) = self.valid_cached() {
			return Ok(token);
		}

		self.metrics.record_attempt();

		let refresh_token = self.cached.read().refresh_token.clone().ok_or_else(|| {
			self.metrics.record_failure();

			TokenError::MissingRefreshToken
		})?;
		let token = self.grant.refresh(refresh_token.expose()).await.map_err(|err| {
			self.metrics.record_failure();

			TokenError::Refresh(err)
		})?;

		*self.cached.write() = token.clone();
		self.metrics.record_success();

		Ok(token)
	}

	fn valid_cached(&self) -> Option<Token> {
		let cached = self.cached.read();

		cached.is_valid_at(OffsetDateTime::now_utc(), self.expiry_delta).then(|| cached.clone())
	}
}
impl<C> TokenProvider for TokenSource<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn current_token(&self) -> TokenFuture<'_> {
		Box::pin(async move { self.token().await.map(|token| token.access_token) })
	}
}
impl<C> Debug for TokenSource<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenSource")
			.field("grant", &self.grant)
			.field("cached", &*self.cached.read())
			.field("expiry_delta", &self.expiry_delta)
			.field("metrics", &self.metrics)
			.finish()
	}
}
