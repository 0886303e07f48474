//! Client configuration and its built-in defaults.

// self
use crate::_prelude::*;

/// Configuration consumed by [`Client::new`](crate::client::Client::new).
///
/// Deserializes from JSON using the wire names `api_url`, `user`, `password`,
/// `skip_ssl_validation`, `ca_pem`, and `auth_token`; missing fields take the defaults.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	/// API base address, e.g. `https://api.example.com`.
	#[serde(rename = "api_url")]
	pub api_address: String,
	/// Resource owner user name.
	#[serde(rename = "user")]
	pub username: String,
	/// Resource owner password.
	pub password: String,
	/// Accepts any server certificate when `true`; wins over [`Config::ca_pem`].
	pub skip_ssl_validation: bool,
	/// PEM-encoded certificate authorities to trust instead of the bundled roots.
	pub ca_pem: String,
	/// Pre-supplied bearer token.
	#[serde(rename = "auth_token")]
	pub token: String,
	/// Base transport reused while certificates are validated against the default roots.
	#[serde(skip)]
	pub http_client: Option<ReqwestClient>,
}
impl Config {
	/// Default API address.
	pub const DEFAULT_API_ADDRESS: &str = "http://api.bosh-lite.com";
	/// Default user name.
	pub const DEFAULT_USERNAME: &str = "admin";
	/// Default password.
	pub const DEFAULT_PASSWORD: &str = "admin";

	/// Creates a default configuration pointing at `api_address`.
	pub fn new(api_address: impl Into<String>) -> Self {
		Self { api_address: api_address.into(), ..Default::default() }
	}

	/// Sets the resource owner credentials.
	pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
		self.username = username.into();
		self.password = password.into();

		self
	}

	/// Enables or disables certificate validation bypass.
	pub fn with_skip_ssl_validation(mut self, skip: bool) -> Self {
		self.skip_ssl_validation = skip;

		self
	}

	/// Sets the PEM-encoded certificate authorities to trust.
	pub fn with_ca_pem(mut self, ca_pem: impl Into<String>) -> Self {
		self.ca_pem = ca_pem.into();

		self
	}

	/// Sets the pre-supplied bearer token.
	pub fn with_token(mut self, token: impl Into<String>) -> Self {
		self.token = token.into();

		self
	}

	/// Supplies a preconfigured base transport (timeouts, proxies, ...).
	pub fn with_http_client(mut self, client: ReqwestClient) -> Self {
		self.http_client = Some(client);

		self
	}

	/// Replaces every empty address, credential, and token field with its default.
	pub fn with_defaults(mut self) -> Self {
		let defaults = Self::default();

		if self.api_address.is_empty() {
			self.api_address = defaults.api_address;
		}
		if self.username.is_empty() {
			self.username = defaults.username;
		}
		if self.password.is_empty() {
			self.password = defaults.password;
		}
		if self.token.is_empty() {
			self.token = defaults.token;
		}

		self
	}
}
impl Default for Config {
	fn default() -> Self {
		Self {
			api_address: Self::DEFAULT_API_ADDRESS.into(),
			username: Self::DEFAULT_USERNAME.into(),
			password: Self::DEFAULT_PASSWORD.into(),
			skip_ssl_validation: false,
			ca_pem: String::new(),
			token: String::new(),
			http_client: None,
		}
	}
}
impl Debug for Config {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Config")
			.field("api_address", &self.api_address)
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.field("skip_ssl_validation", &self.skip_ssl_validation)
			.field("ca_pem_set", &!self.ca_pem.is_empty())
			.field("token_set", &!self.token.is_empty())
			.field("http_client_set", &self.http_client.is_some())
			.finish()
	}
}
