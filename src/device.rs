//! Device families, transports and the credential set a session is built from.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_SSH_PORT, DEFAULT_TELNET_PORT, DEFAULT_TIMEOUT_SECS};
use crate::error::ExecError;

/// Supported device families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Ciena,
    BrocadeCes,
    BrocadeIcx,
    BrocadeFws,
    #[serde(rename = "alcatel_7210")]
    Alcatel7210,
}

impl DeviceType {
    /// Every device type, in catalog order.
    pub const ALL: [DeviceType; 5] = [
        DeviceType::Ciena,
        DeviceType::BrocadeCes,
        DeviceType::BrocadeIcx,
        DeviceType::BrocadeFws,
        DeviceType::Alcatel7210,
    ];

    /// Wire value, e.g. `brocade_icx`.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Ciena => "ciena",
            DeviceType::BrocadeCes => "brocade_ces",
            DeviceType::BrocadeIcx => "brocade_icx",
            DeviceType::BrocadeFws => "brocade_fws",
            DeviceType::Alcatel7210 => "alcatel_7210",
        }
    }

    /// Display label: underscores become spaces and each word is capitalized.
    pub fn label(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = ExecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        DeviceType::ALL
            .into_iter()
            .find(|dt| dt.as_str() == key)
            .ok_or_else(|| ExecError::validation(format!("'{s}' is not a valid DeviceType")))
    }
}

/// Transport used to reach the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    #[default]
    Ssh,
    Telnet,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::Ssh => "ssh",
            ConnectionType::Telnet => "telnet",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            ConnectionType::Ssh => DEFAULT_SSH_PORT,
            ConnectionType::Telnet => DEFAULT_TELNET_PORT,
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionType {
    type Err = ExecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ssh" => Ok(ConnectionType::Ssh),
            "telnet" => Ok(ConnectionType::Telnet),
            _ => Err(ExecError::validation(format!(
                "'{s}' is not a valid ConnectionType"
            ))),
        }
    }
}

/// Everything needed to open one session against one device.
///
/// Built once per request and never mutated afterwards. The device type is
/// mandatory: there is no implicit default family.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceCredentials {
    ip_address: String,
    username: String,
    password: String,
    enable_password: Option<String>,
    port: Option<u16>,
    device_type: DeviceType,
    connection_type: ConnectionType,
    timeout_secs: u64,
}

impl DeviceCredentials {
    /// Creates an SSH credential set with the default timeout and port.
    pub fn new(
        ip_address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        device_type: DeviceType,
    ) -> Self {
        Self {
            ip_address: ip_address.into(),
            username: username.into(),
            password: password.into(),
            enable_password: None,
            port: None,
            device_type,
            connection_type: ConnectionType::Ssh,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_enable_password(mut self, enable_password: Option<String>) -> Self {
        self.enable_password = enable_password.filter(|p| !p.is_empty());
        self
    }

    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    pub fn with_connection_type(mut self, connection_type: ConnectionType) -> Self {
        self.connection_type = connection_type;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn ip_address(&self) -> &str {
        &self.ip_address
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn enable_password(&self) -> Option<&str> {
        self.enable_password.as_deref()
    }

    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    pub fn connection_type(&self) -> ConnectionType {
        self.connection_type
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Explicit port, or the transport default.
    pub fn port(&self) -> u16 {
        self.port
            .unwrap_or_else(|| self.connection_type.default_port())
    }

    /// `ip:port`, used in log lines and error messages.
    pub fn target(&self) -> String {
        format!("{}:{}", self.ip_address, self.port())
    }
}

// Passwords stay out of debug output and therefore out of the logs.
impl fmt::Debug for DeviceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCredentials")
            .field("ip_address", &self.ip_address)
            .field("username", &self.username)
            .field("password", &"***")
            .field(
                "enable_password",
                &self.enable_password.as_ref().map(|_| "***"),
            )
            .field("port", &self.port)
            .field("device_type", &self.device_type)
            .field("connection_type", &self.connection_type)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
