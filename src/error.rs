//! Client-level error types shared across the bootstrap sequence and request path.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Custom CA bundle could not be turned into trust anchors.
	#[error(transparent)]
	InvalidCertificate(#[from] CertificateError),
	/// HTTP transport could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying builder failure.
		#[source]
		source: ReqwestError,
	},
	/// Endpoint discovery failed outside of client construction.
	///
	/// Only produced when callers propagate [`discover`](crate::discovery::discover) with `?`;
	/// [`Client::new`](crate::client::Client::new) reports discovery failures as
	/// [`Error::Configuration`].
	#[error(transparent)]
	Discovery(#[from] DiscoveryError),
	/// Endpoint discovery failed while constructing a client.
	#[error("Could not load the API endpoint information.")]
	Configuration {
		/// Discovery failure that aborted construction.
		#[source]
		source: DiscoveryError,
	},
	/// Credential exchange failed.
	#[error(transparent)]
	Authentication(#[from] AuthenticationError),
	/// Request body object could not be encoded as JSON.
	#[error("Request body could not be encoded as JSON.")]
	Serialization {
		/// Underlying encoder failure.
		#[source]
		source: serde_json::Error,
	},
	/// Transport failure (DNS, TCP, TLS) while executing a request.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Access token could not be produced.
	#[error(transparent)]
	Token(#[from] TokenError),
}

/// Failures raised while decoding a PEM-encoded certificate authority.
#[derive(Debug, ThisError)]
pub enum CertificateError {
	/// PEM text could not be decoded.
	#[error("Unable to decode keychain from PEM string.")]
	Malformed {
		/// Underlying decoding failure.
		#[source]
		source: ReqwestError,
	},
	/// PEM text decoded but contained no certificate.
	#[error("PEM string does not contain any certificate.")]
	NoCertificates,
}

/// Failures raised while fetching or decoding the `/v2/info` document.
#[derive(Debug, ThisError)]
pub enum DiscoveryError {
	/// API address cannot be turned into an info URL.
	#[error("API address `{address}` is not a valid URL.")]
	InvalidAddress {
		/// Configured API address.
		address: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Info request could not be sent or its body could not be read.
	#[error("Could not get {url}.")]
	Request {
		/// Info URL that was requested.
		url: String,
		/// Underlying transport failure.
		#[source]
		source: ReqwestError,
	},
	/// Info endpoint answered with a non-success status.
	#[error("Info endpoint {url} returned HTTP {status}.")]
	UnexpectedStatus {
		/// Info URL that was requested.
		url: String,
		/// HTTP status code.
		status: u16,
	},
	/// Info body is not a valid endpoint document.
	#[error("Info endpoint {url} returned a malformed document.")]
	Decode {
		/// Info URL that was requested.
		url: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// Failures raised by OAuth 2.0 grants against the token endpoint.
#[derive(Debug, ThisError)]
pub enum AuthenticationError {
	/// Discovered endpoint cannot be used as an OAuth URL.
	#[error("The {endpoint} endpoint is not a valid URL.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Token endpoint answered with an OAuth error response.
	#[error("Token endpoint rejected the {grant} grant: {reason}.")]
	Rejected {
		/// Grant label.
		grant: &'static str,
		/// OAuth error code or description.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with JSON that is not a token response.
	#[error("Token endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with something unexpected.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	UnexpectedResponse {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token request could not be constructed.
	#[error(transparent)]
	Request(#[from] oauth2::http::Error),
	/// Token endpoint could not be reached.
	#[error(transparent)]
	Transport(#[from] TransportError),
}
impl AuthenticationError {
	/// Returns the HTTP status attached to the failure, when one was observed.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Rejected { status, .. }
			| Self::MalformedResponse { status, .. }
			| Self::UnexpectedResponse { status, .. } => *status,
			_ => None,
		}
	}
}

/// Failures raised while producing the current access token.
#[derive(Debug, ThisError)]
pub enum TokenError {
	/// Cached token expired and the provider never issued a refresh token.
	#[error("Token expired and refresh token is not set.")]
	MissingRefreshToken,
	/// Refresh grant failed; the cached token is left untouched.
	#[error("Error getting bearer token.")]
	Refresh(#[source] AuthenticationError),
	/// Access token cannot be carried in an HTTP header.
	#[error("Access token is not a valid HTTP header value.")]
	InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
impl From<ReqwestError> for Error {
	fn from(e: ReqwestError) -> Self {
		TransportError::from(e).into()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn configuration_error_keeps_discovery_source() {
		let err = Error::Configuration {
			source: DiscoveryError::UnexpectedStatus {
				url: "http://api.example.com/v2/info".into(),
				status: 503,
			},
		};
		let source = err.source().expect("Configuration errors should expose their source.");

		assert_eq!(err.to_string(), "Could not load the API endpoint information.");
		assert_eq!(source.to_string(), "Info endpoint http://api.example.com/v2/info returned HTTP 503.");
	}

	#[test]
	fn authentication_status_reads_response_metadata() {
		let rejected = AuthenticationError::Rejected {
			grant: "password",
			reason: "invalid_grant".into(),
			status: Some(401),
		};
		let io = AuthenticationError::Transport(TransportError::Io(std::io::Error::other("reset")));

		assert_eq!(rejected.status(), Some(401));
		assert_eq!(io.status(), None);
	}
}
