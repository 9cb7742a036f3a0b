//! Async SDK for the REST API.
//!
//! ```rust,no_run
//! use netops::api::DeviceConfig;
//! use netops::client::NetOpsClient;
//! use netops::device::DeviceType;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), netops::error::ClientError> {
//!     let client = NetOpsClient::new("http://localhost:5000")?;
//!     let device = DeviceConfig::new("10.0.0.5", "admin", "secret", DeviceType::BrocadeIcx);
//!     let run = client.execute_device(device, None).await?;
//!     for (command, output) in run.results.iter() {
//!         println!("{command}:\n{output}");
//!     }
//!     client.download_results(&run.result_id, "run.json").await?;
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::api::{
    BatchExecuteRequest, BatchExecuteResponse, CommandsResponse, DeviceConfig,
    DeviceTypesResponse, ErrorResponse, ExecuteRequest, ExecuteResponse, HealthResponse,
    ResultResponse,
};
use crate::cache::CacheEntry;
use crate::catalog::DeviceTypeInfo;
use crate::device::DeviceType;
use crate::error::ClientError;

/// Request timeout used by [`NetOpsClient::new`].
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Header carrying the optional API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Client for one API server.
#[derive(Debug, Clone)]
pub struct NetOpsClient {
    base_url: String,
    http: Client,
    timeout: Duration,
}

impl NetOpsClient {
    /// Client with the default timeout and no API key.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, None, DEFAULT_CLIENT_TIMEOUT)
    }

    pub fn with_options(
        base_url: impl Into<String>,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(key).map_err(|_| {
                ClientError::Config("API key is not a valid header value".to_string())
            })?;
            headers.insert(API_KEY_HEADER, value);
        }
        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends the request and returns the raw body of a 2xx response.
    async fn send(&self, request: RequestBuilder) -> Result<Vec<u8>, ClientError> {
        let response = request.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.classify(e))?
            .to_vec();
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
            return Err(ClientError::Http {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let body = self.send(request).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn classify(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout(self.timeout.as_secs())
        } else if err.is_connect() {
            ClientError::Connect(self.base_url.clone())
        } else {
            ClientError::Request(err)
        }
    }

    pub async fn health_check(&self) -> Result<HealthResponse, ClientError> {
        self.send_json(self.http.get(self.url("/api/health"))).await
    }

    /// True when the server answers the health check with `healthy`.
    pub async fn is_healthy(&self) -> bool {
        match self.health_check().await {
            Ok(health) => health.status == "healthy",
            Err(e) => {
                debug!("Health check against {} failed: {}", self.base_url, e);
                false
            }
        }
    }

    pub async fn device_types(&self) -> Result<Vec<DeviceTypeInfo>, ClientError> {
        let response: DeviceTypesResponse = self
            .send_json(self.http.get(self.url("/api/device-types")))
            .await?;
        Ok(response.device_types)
    }

    pub async fn basic_commands(
        &self,
        device_type: DeviceType,
    ) -> Result<Vec<String>, ClientError> {
        let response: CommandsResponse = self
            .send_json(
                self.http
                    .post(self.url("/api/basic-commands"))
                    .json(&json!({ "device_type": device_type })),
            )
            .await?;
        Ok(response.commands)
    }

    pub async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteResponse, ClientError> {
        let response: ExecuteResponse = self
            .send_json(self.http.post(self.url("/api/execute")).json(request))
            .await?;
        ensure_success(response.success)?;
        Ok(response)
    }

    /// Runs `commands` on `device`, or the catalog commands when `commands` is `None`.
    pub async fn execute_device(
        &self,
        device: DeviceConfig,
        commands: Option<Vec<String>>,
    ) -> Result<ExecuteResponse, ClientError> {
        let request = ExecuteRequest {
            device,
            use_basic_commands: commands.is_none(),
            commands: commands.unwrap_or_default(),
        };
        self.execute(&request).await
    }

    /// Runs the same command selection on every device; per-device failures
    /// come back as `failed` outcomes, not as an error.
    pub async fn batch_execute(
        &self,
        devices: Vec<DeviceConfig>,
        use_basic_commands: bool,
        commands: Option<Vec<String>>,
    ) -> Result<BatchExecuteResponse, ClientError> {
        let request = BatchExecuteRequest {
            devices,
            use_basic_commands,
            commands: commands.unwrap_or_default(),
        };
        let response: BatchExecuteResponse = self
            .send_json(self.http.post(self.url("/api/batch-execute")).json(&request))
            .await?;
        ensure_success(response.success)?;
        Ok(response)
    }

    pub async fn get_results(&self, result_id: &str) -> Result<CacheEntry, ClientError> {
        let response: ResultResponse = self
            .send_json(self.http.get(self.url(&format!("/api/results/{result_id}"))))
            .await?;
        ensure_success(response.success)?;
        Ok(response.data)
    }

    /// Downloads a stored entry and writes it to `path` as indented JSON.
    pub async fn download_results(
        &self,
        result_id: &str,
        path: impl AsRef<Path>,
    ) -> Result<PathBuf, ClientError> {
        let entry: CacheEntry = self
            .send_json(
                self.http
                    .get(self.url(&format!("/api/results/{result_id}/download"))),
            )
            .await?;
        let path = path.as_ref().to_path_buf();
        tokio::fs::write(&path, serde_json::to_vec_pretty(&entry)?).await?;
        debug!("Saved result {} to {}", result_id, path.display());
        Ok(path)
    }
}

fn ensure_success(success: bool) -> Result<(), ClientError> {
    if success {
        Ok(())
    } else {
        Err(ClientError::Api("server reported failure".to_string()))
    }
}
