//! Request and response bodies of the REST API, shared by server and SDK.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::cache::CacheEntry;
use crate::catalog::DeviceTypeInfo;
use crate::config::DEFAULT_TIMEOUT_SECS;
use crate::device::{ConnectionType, DeviceCredentials, DeviceType};
use crate::error::ExecError;
use crate::outcome::{BatchOutcome, ExecutionResult};

/// Fields every device entry must carry, in the order they are checked.
pub const REQUIRED_DEVICE_FIELDS: [&str; 4] = ["ip_address", "username", "password", "device_type"];

/// Connection details for one device as they appear on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeviceConfig {
    pub ip_address: String,
    pub username: String,
    pub password: String,
    /// One of the values listed by `GET /api/device-types`.
    pub device_type: String,
    #[serde(default)]
    pub connection_type: ConnectionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_password: Option<String>,
    /// Connect timeout in seconds (default 30).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Display name used in batch results; defaults to the IP address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DeviceConfig {
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
            device_type: device_type.as_str().to_string(),
            connection_type: ConnectionType::Ssh,
            port: None,
            enable_password: None,
            timeout: None,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_connection_type(mut self, connection_type: ConnectionType) -> Self {
        self.connection_type = connection_type;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_enable_password(mut self, enable_password: impl Into<String>) -> Self {
        self.enable_password = Some(enable_password.into());
        self
    }

    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Name shown in batch results.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.ip_address)
    }

    /// Validates the entry and builds the credential set for it.
    pub fn to_credentials(&self) -> Result<DeviceCredentials, ExecError> {
        let device_type: DeviceType = self.device_type.parse()?;
        Ok(DeviceCredentials::new(
            self.ip_address.clone(),
            self.username.clone(),
            self.password.clone(),
            device_type,
        )
        .with_enable_password(self.enable_password.clone())
        .with_port(self.port)
        .with_connection_type(self.connection_type)
        .with_timeout_secs(self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS)))
    }
}

/// Body of `POST /api/execute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExecuteRequest {
    #[serde(flatten)]
    pub device: DeviceConfig,
    /// Run the catalog commands for the device type.
    #[serde(default)]
    pub use_basic_commands: bool,
    /// Commands to run; takes precedence over `use_basic_commands` when non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
}

/// Body of `POST /api/batch-execute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BatchExecuteRequest {
    pub devices: Vec<DeviceConfig>,
    #[serde(default)]
    pub use_basic_commands: bool,
    #[serde(default)]
    pub commands: Vec<String>,
}

/// Body of `POST /api/basic-commands`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BasicCommandsRequest {
    pub device_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub cached_results: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTypesResponse {
    pub success: bool,
    pub device_types: Vec<DeviceTypeInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandsResponse {
    pub success: bool,
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub success: bool,
    pub result_id: String,
    pub results: ExecutionResult,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchExecuteResponse {
    pub success: bool,
    pub batch_id: String,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<BatchOutcome>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultResponse {
    pub success: bool,
    pub data: CacheEntry,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_config_defaults_to_ssh_and_30s() {
        let config: DeviceConfig = serde_json::from_str(
            r#"{"ip_address":"10.0.0.5","username":"admin","password":"x","device_type":"ciena"}"#,
        )
        .expect("decode");
        let creds = config.to_credentials().expect("credentials");
        assert_eq!(creds.connection_type(), ConnectionType::Ssh);
        assert_eq!(creds.timeout_secs(), 30);
        assert_eq!(creds.port(), 22);
        assert_eq!(config.display_name(), "10.0.0.5");
    }

    #[test]
    fn unknown_device_type_is_rejected_when_building_credentials() {
        let mut config = DeviceConfig::new("10.0.0.5", "admin", "x", DeviceType::Ciena);
        config.device_type = "mikrotik".to_string();
        let err = config.to_credentials().expect_err("unknown type");
        assert!(err.is_validation());
    }

    #[test]
    fn execute_request_flattens_device_fields() {
        let request = ExecuteRequest {
            device: DeviceConfig::new("10.0.0.5", "admin", "x", DeviceType::BrocadeIcx)
                .with_connection_type(ConnectionType::Telnet),
            use_basic_commands: true,
            commands: Vec::new(),
        };
        let value = serde_json::to_value(&request).expect("encode");
        assert_eq!(value["ip_address"], "10.0.0.5");
        assert_eq!(value["device_type"], "brocade_icx");
        assert_eq!(value["connection_type"], "telnet");
        assert_eq!(value["use_basic_commands"], true);
        assert!(value.get("commands").is_none());
        assert!(value.get("port").is_none());
    }

    #[test]
    fn device_schema_lists_required_fields() {
        let schema = serde_json::to_value(schemars::schema_for!(DeviceConfig)).expect("schema");
        let required = schema["required"].as_array().expect("required list");
        for field in REQUIRED_DEVICE_FIELDS {
            assert!(
                required.iter().any(|r| r == field),
                "{field} should be required"
            );
        }
    }
}
