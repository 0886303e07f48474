//! Async Cloud Foundry API client: endpoint discovery, UAA password grants, pinned-CA
//! transports, and bearer-authenticated requests behind one facade.
//!
//! [`Client::new`](client::Client::new) runs the whole bootstrap sequence. It builds a
//! transport for the configured [`TlsPolicy`](transport::TlsPolicy), discovers the deployment
//! endpoints from `GET {api}/v2/info`, exchanges the configured credentials for a token, and
//! wraps the transport so every request carries `Authorization: Bearer <token>`.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod client;
pub mod discovery;
pub mod error;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod token;
pub mod transport;

#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and fixtures shared by the integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::client::Config;

	/// Access token issued by the fixtures' password grant.
	pub const TEST_ACCESS_TOKEN: &str = "foobar2";
	/// Refresh token issued by the fixtures' password grant.
	pub const TEST_REFRESH_TOKEN: &str = "refresh-foobar2";

	/// Builds a `/v2/info` document whose UAA endpoints point back at `base_url`.
	pub fn info_document(base_url: &str) -> String {
		serde_json::json!({
			"name": "mock-cf",
			"api_version": "2.75.0",
			"doppler_logging_endpoint": "wss://doppler.mock.example.com:443",
			"logging_endpoint": "wss://loggregator.mock.example.com:443",
			"authorization_endpoint": base_url,
			"token_endpoint": base_url,
		})
		.to_string()
	}

	/// Builds a token endpoint response body.
	pub fn token_document(access_token: &str, refresh_token: Option<&str>, expires_in: u64) -> String {
		let mut body = serde_json::json!({
			"access_token": access_token,
			"token_type": "bearer",
			"expires_in": expires_in,
			"scope": "cloud_controller.read",
		});

		if let Some(refresh_token) = refresh_token {
			body["refresh_token"] = refresh_token.into();
		}

		body.to_string()
	}

	/// Returns a client configuration pointing at `base_url` with test credentials.
	pub fn test_config(base_url: &str) -> Config {
		Config::new(base_url).with_credentials("foo", "bar")
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
