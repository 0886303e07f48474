//! Transport construction for the configured TLS trust policy.
//!
//! Every transport built here refuses to follow redirects, because the same client is handed to
//! the `oauth2` crate for token exchanges and token endpoints must answer directly.

// crates.io
use reqwest::{Certificate, redirect::Policy};
// self
use crate::{_prelude::*, error::CertificateError, obs};

/// Certificate validation mode used when building the base transport.
#[derive(Clone, PartialEq, Eq)]
pub enum TlsPolicy {
	/// Validate against the bundled web PKI roots.
	Strict,
	/// Validate against exactly the PEM-encoded certificate authorities supplied.
	PinnedCa(String),
	/// Accept any server certificate and host name.
	Insecure,
}
impl TlsPolicy {
	/// Derives the policy from the configuration flags.
	///
	/// Skipping validation wins over a supplied CA: the CA is only honored while validation is
	/// enabled.
	pub fn from_config(skip_ssl_validation: bool, ca_pem: &str) -> Self {
		if skip_ssl_validation {
			Self::Insecure
		} else if ca_pem.is_empty() {
			Self::Strict
		} else {
			Self::PinnedCa(ca_pem.to_owned())
		}
	}
}
impl Debug for TlsPolicy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Strict => f.write_str("Strict"),
			Self::PinnedCa(pem) => f.debug_tuple("PinnedCa").field(&format!("<{} bytes>", pem.len())).finish(),
			Self::Insecure => f.write_str("Insecure"),
		}
	}
}

/// Builds the base HTTP transport for `policy`.
///
/// A `preset` client is reused as-is under [`TlsPolicy::Strict`], which lets callers configure
/// timeouts or proxies before construction. The other policies always build a fresh client so
/// the requested trust settings cannot be bypassed.
pub fn build(policy: &TlsPolicy, preset: Option<&ReqwestClient>) -> Result<ReqwestClient> {
	let builder = ReqwestClient::builder().redirect(Policy::none());
	let builder = match policy {
		TlsPolicy::Strict => {
			if let Some(client) = preset {
				return Ok(client.clone());
			}

			builder
		},
		TlsPolicy::PinnedCa(pem) => decode_pem_bundle(pem)?
			.into_iter()
			.fold(builder.tls_built_in_root_certs(false), |builder, cert| {
				builder.add_root_certificate(cert)
			}),
		TlsPolicy::Insecure => {
			obs::warn_insecure_transport();

			builder.danger_accept_invalid_certs(true).danger_accept_invalid_hostnames(true)
		},
	};

	builder.build().map_err(|source| Error::HttpClientBuild { source })
}

/// Decodes every certificate in a PEM bundle, failing when none can be found.
pub fn decode_pem_bundle(pem: &str) -> Result<Vec<Certificate>, CertificateError> {
	let certs = Certificate::from_pem_bundle(pem.trim().as_bytes())
		.map_err(|source| CertificateError::Malformed { source })?;

	if certs.is_empty() {
		return Err(CertificateError::NoCertificates);
	}

	Ok(certs)
}
