//! Endpoint discovery through the `/v2/info` document.

// self
use crate::{
	_prelude::*,
	error::DiscoveryError,
	obs::{self, FlowKind},
};

/// Path of the discovery document relative to the API address.
pub const INFO_PATH: &str = "/v2/info";

/// Service endpoints advertised by a deployment.
///
/// Keys missing from the discovery document (or set to `null`) decode to empty strings and
/// unknown keys are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
	/// Streaming log (doppler) endpoint.
	#[serde(rename = "doppler_logging_endpoint", deserialize_with = "null_as_empty")]
	pub doppler: String,
	/// Logging endpoint.
	#[serde(rename = "logging_endpoint", deserialize_with = "null_as_empty")]
	pub logging: String,
	/// Authorization server (login) endpoint.
	#[serde(rename = "authorization_endpoint", deserialize_with = "null_as_empty")]
	pub authorization: String,
	/// Token server (UAA) endpoint.
	#[serde(rename = "token_endpoint", deserialize_with = "null_as_empty")]
	pub token: String,
}
impl Endpoints {
	/// Endpoints of a local bosh-lite deployment, used when no API address is configured.
	pub fn fallback() -> Self {
		Self {
			doppler: "wss://doppler.10.244.0.34.xip.io:443".into(),
			logging: "wss://loggregator.10.244.0.34.xip.io:443".into(),
			authorization: "https://login.10.244.0.34.xip.io".into(),
			token: "https://uaa.10.244.0.34.xip.io".into(),
		}
	}
}

/// Fetches the endpoint set for `api_address`.
///
/// An empty address returns [`Endpoints::fallback`] without touching the network. Otherwise the
/// info document is read completely before it is decoded, so the connection is released on
/// every path.
pub async fn discover(api_address: &str, http_client: &ReqwestClient) -> Result<Endpoints, DiscoveryError> {
	if api_address.is_empty() {
		return Ok(Endpoints::fallback());
	}

	obs::observe(FlowKind::Discovery, "discover", async {
		let url = info_url(api_address)?;
		let url_string = url.to_string();
		let response = http_client
			.get(url)
			.send()
			.await
			.map_err(|source| DiscoveryError::Request { url: url_string.clone(), source })?;
		let status = response.status();

		if !status.is_success() {
			return Err(DiscoveryError::UnexpectedStatus { url: url_string, status: status.as_u16() });
		}

		let body = response
			.bytes()
			.await
			.map_err(|source| DiscoveryError::Request { url: url_string.clone(), source })?;

		decode_endpoints(&body).map_err(|source| DiscoveryError::Decode { url: url_string, source })
	})
	.await
}

/// Builds `{api_address}/v2/info`, tolerating a trailing slash on the address.
pub fn info_url(api_address: &str) -> Result<Url, DiscoveryError> {
	let raw = format!("{}{INFO_PATH}", api_address.trim_end_matches('/'));

	Url::parse(&raw)
		.map_err(|source| DiscoveryError::InvalidAddress { address: api_address.to_owned(), source })
}

/// Decodes a discovery document, reporting the JSON path of any failure.
pub fn decode_endpoints(body: &[u8]) -> Result<Endpoints, serde_path_to_error::Error<serde_json::Error>> {
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: serde::Deserializer<'de>,
{
	Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}
