//! Client configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use xdevapi_proto::IntegerPolicy;

/// Default X Protocol address.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:33060";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum message size (64 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = xdevapi_proto::framing::MAX_MESSAGE_SIZE;

/// Default user.
pub const DEFAULT_USER: &str = "root";

/// Authentication mechanism used after capability negotiation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthMechanism {
    /// Challenge-response against the server's cached password hash.
    #[default]
    Sha256Memory,
    /// Cleartext password; only sensible over TLS or a local socket.
    Plain,
}

impl AuthMechanism {
    /// Name sent in `AuthenticateStart`.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMechanism::Sha256Memory => "SHA256_MEMORY",
            AuthMechanism::Plain => "PLAIN",
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server address (`host:port`).
    pub address: String,

    /// Account name.
    pub user: String,

    /// Account password.
    #[serde(skip_serializing)]
    pub password: String,

    /// Default schema for the session.
    pub schema: Option<String>,

    /// Connect and request timeout.
    #[serde(with = "duration_millis")]
    pub timeout: Duration,

    /// Close the connection after this long without traffic.
    #[serde(with = "option_duration_millis")]
    pub idle_timeout: Option<Duration>,

    /// Maximum message size in bytes, both directions.
    pub max_message_size: usize,

    /// Request TLS during capability negotiation.
    pub tls: bool,

    /// Mark the session as interactive.
    pub interactive: bool,

    /// Attributes sent as `session_connect_attrs`.
    pub connect_attrs: BTreeMap<String, String>,

    /// Authentication mechanism.
    pub auth_mechanism: AuthMechanism,

    /// How integers beyond ±2^53 are decoded.
    pub integer_policy: IntegerPolicy,
}

impl ClientConfig {
    /// Create a new client configuration with the specified address.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            user: DEFAULT_USER.to_string(),
            password: String::new(),
            schema: None,
            timeout: DEFAULT_TIMEOUT,
            idle_timeout: None,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            tls: false,
            interactive: false,
            connect_attrs: default_connect_attrs(),
            auth_mechanism: AuthMechanism::default(),
            integer_policy: IntegerPolicy::default(),
        }
    }

    /// Create a configuration for connecting to localhost on the default port.
    pub fn localhost() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }

    /// Set the account.
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    /// Set the default schema.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the idle timeout.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = Some(idle_timeout);
        self
    }

    /// Set the maximum message size.
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Request TLS.
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Mark the session as interactive.
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Add a connection attribute.
    pub fn with_connect_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.connect_attrs.insert(key.into(), value.into());
        self
    }

    /// Set the authentication mechanism.
    pub fn with_auth_mechanism(mut self, mechanism: AuthMechanism) -> Self {
        self.auth_mechanism = mechanism;
        self
    }

    /// Set the integer decode policy.
    pub fn with_integer_policy(mut self, policy: IntegerPolicy) -> Self {
        self.integer_policy = policy;
        self
    }

    /// Load a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::localhost()
    }
}

fn default_connect_attrs() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("_client_name".to_string(), env!("CARGO_PKG_NAME").to_string()),
        ("_client_version".to_string(), env!("CARGO_PKG_VERSION").to_string()),
        ("_os".to_string(), std::env::consts::OS.to_string()),
        ("_pid".to_string(), std::process::id().to_string()),
    ])
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod option_duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
    }
}
