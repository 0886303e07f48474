//! Pending request builder consumed by [`Client::do_request`](crate::client::Client::do_request).

// crates.io
use reqwest::{Body, Method, Request, header::CONTENT_TYPE};
// self
use crate::{_prelude::*, error::TransportError};

/// Request under construction: method, target URL, query parameters, and an optional body.
///
/// A raw body always wins over an object body; the object is only encoded as JSON when no raw
/// body was attached.
#[derive(Debug)]
pub struct PendingRequest {
	method: Method,
	url: String,
	params: Vec<(String, String)>,
	body: Option<Body>,
	obj: Option<serde_json::Result<Vec<u8>>>,
}
impl PendingRequest {
	pub(crate) fn new(method: Method, url: String) -> Self {
		Self { method, url, params: Vec::new(), body: None, obj: None }
	}

	pub(crate) fn with_body(mut self, body: Body) -> Self {
		self.body = Some(body);

		self
	}

	/// Appends a query parameter.
	pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.params.push((key.into(), value.into()));

		self
	}

	/// Attaches an object to be sent as a JSON body.
	///
	/// Encoding failures are reported by `do_request` as
	/// [`Error::Serialization`](crate::error::Error::Serialization).
	pub fn json<T>(mut self, obj: &T) -> Self
	where
		T: ?Sized + Serialize,
	{
		self.obj = Some(serde_json::to_vec(obj));

		self
	}

	/// HTTP method.
	pub fn method(&self) -> &Method {
		&self.method
	}

	/// Target URL without query parameters.
	pub fn url(&self) -> &str {
		&self.url
	}

	/// Query parameters in insertion order.
	pub fn params(&self) -> &[(String, String)] {
		&self.params
	}

	/// Converts the pending request into a wire-level request built by `http_client`.
	pub fn into_request(self, http_client: &ReqwestClient) -> Result<Request> {
		let mut builder = http_client.request(self.method, self.url.as_str());

		if !self.params.is_empty() {
			builder = builder.query(&self.params);
		}

		match (self.body, self.obj) {
			(Some(body), _) => builder = builder.body(body),
			(None, Some(encoded)) => {
				let bytes = encoded.map_err(|source| Error::Serialization { source })?;

				builder = builder.header(CONTENT_TYPE, "application/json").body(bytes);
			},
			(None, None) => (),
		}

		builder.build().map_err(|e| TransportError::from(e).into())
	}
}
