//! HTTP senders used by the client.
//!
//! [`TokenHttpClient`] is the seam between the OAuth 2.0 grants and the HTTP stack: the grants
//! request short-lived [`AsyncHttpClient`] handles that publish [`ResponseMetadata`] through a
//! [`ResponseMetadataSlot`], so token endpoint failures can be reported with the HTTP status
//! that produced them. [`AuthorizedHttpClient`] is the sender handed to API callers; it stamps
//! every request with the current bearer token.

// std
use std::ops::Deref;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::{
	Request, Response,
	header::{AUTHORIZATION, HeaderValue},
};
// self
use crate::{_prelude::*, error::TransportError, token::TokenProvider};

/// Abstraction over HTTP transports capable of executing OAuth token exchanges while
/// publishing response metadata for error reporting.
///
/// Implementations must be `Send + Sync + 'static` so a token source can share them across
/// concurrent refreshes, and the request futures of their handles must be `Send`.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle tied to a [`ResponseMetadataSlot`].
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds an [`AsyncHttpClient`] handle that records outcomes in `slot`.
	///
	/// Handles must call [`ResponseMetadataSlot::take`] before dispatching and
	/// [`ResponseMetadataSlot::store`] as soon as a response status is known.
	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle;
}

/// Captures metadata from the most recent HTTP response for downstream error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the token endpoint, if available.
	pub status: Option<u16>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Thin wrapper around [`ReqwestClient`] used for token exchanges.
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl TokenHttpClient for ReqwestHttpClient {
	type Handle = InstrumentedHandle;
	type TransportError = ReqwestError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		InstrumentedHandle(Arc::new(InstrumentedHttpClient { client: self.0.clone(), slot }))
	}
}

struct InstrumentedHttpClient {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}

/// Handle returned by [`ReqwestHttpClient`] that satisfies [`TokenHttpClient`].
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<InstrumentedHttpClient>);
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			client.slot.take();

			let response = client
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			client.slot.store(ResponseMetadata { status: Some(status.as_u16()) });

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Sender that attaches `Authorization: Bearer <token>` to every request it executes.
///
/// The token comes from a shared [`TokenProvider`], so an expired token is refreshed
/// transparently before the request goes out.
#[derive(Clone)]
pub struct AuthorizedHttpClient {
	client: ReqwestClient,
	tokens: Arc<dyn TokenProvider>,
}
impl AuthorizedHttpClient {
	/// Wraps `client` so requests carry tokens from `tokens`.
	pub fn new(client: ReqwestClient, tokens: Arc<dyn TokenProvider>) -> Self {
		Self { client, tokens }
	}

	/// Returns the unauthenticated base transport, e.g. to build requests.
	pub fn inner(&self) -> &ReqwestClient {
		&self.client
	}

	/// Stamps `request` with the current bearer token and executes it.
	pub async fn execute(&self, mut request: Request) -> Result<Response> {
		let token = self.tokens.current_token().await?;
		let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
			.map_err(crate::error::TokenError::from)?;

		value.set_sensitive(true);
		request.headers_mut().insert(AUTHORIZATION, value);

		self.client.execute(request).await.map_err(|e| TransportError::from(e).into())
	}
}
impl Debug for AuthorizedHttpClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizedHttpClient").field("client", &self.client).finish_non_exhaustive()
	}
}
