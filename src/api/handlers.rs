use super::*;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use log::{error, info};
use serde::Deserialize;
use serde_json::Value;

use crate::cache::{CacheEntry, batch_result_id, single_result_id};
use crate::catalog;
use crate::device::{DeviceCredentials, DeviceType};
use crate::error::ExecError;
use crate::executor::BatchJob;
use crate::outcome::BatchStatus;

/// Lenient view of a batch body: device entries are validated one by one.
#[derive(Deserialize)]
struct RawBatchRequest {
    #[serde(default)]
    devices: Vec<Value>,
    #[serde(default)]
    use_basic_commands: bool,
    #[serde(default)]
    commands: Vec<String>,
}

/// Fails on the first required field that is absent or null.
fn require_device_fields(body: &Value) -> Result<(), ApiError> {
    for field in REQUIRED_DEVICE_FIELDS {
        if body.get(field).is_none_or(Value::is_null) {
            return Err(ApiError::BadRequest(format!(
                "Missing required field: {field}"
            )));
        }
    }
    Ok(())
}

/// Checks the required fields, then decodes and validates one device entry.
fn parse_device(body: &Value) -> Result<DeviceCredentials, ApiError> {
    require_device_fields(body)?;
    let config: DeviceConfig = serde_json::from_value(body.clone())?;
    Ok(config.to_credentials()?)
}

fn explicit_commands(commands: Vec<String>) -> Option<Vec<String>> {
    (!commands.is_empty()).then_some(commands)
}

pub(super) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        cached_results: state.results.len().await,
    })
}

pub(super) async fn device_types() -> Json<DeviceTypesResponse> {
    Json(DeviceTypesResponse {
        success: true,
        device_types: catalog::catalog(),
    })
}

pub(super) async fn basic_commands(
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<CommandsResponse>, ApiError> {
    let Json(body) = body?;
    let device_type: DeviceType = body
        .get("device_type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .parse()
        .map_err(|e: ExecError| {
            error!("Error getting basic commands: {}", e);
            ApiError::Internal(e.to_string())
        })?;

    Ok(Json(CommandsResponse {
        success: true,
        commands: catalog::default_commands(device_type),
    }))
}

pub(super) async fn execute(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let Json(body) = body?;
    let credentials = parse_device(&body)?;
    let request: ExecuteRequest = serde_json::from_value(body)?;

    info!(
        "Executing on {} ({})",
        credentials.target(),
        credentials.device_type()
    );
    let results = state
        .executor
        .execute(
            &credentials,
            explicit_commands(request.commands),
            request.use_basic_commands,
        )
        .await?;

    let entry = state
        .results
        .insert(CacheEntry::single(
            single_result_id(credentials.ip_address()),
            &credentials,
            results.clone(),
        ))
        .await;

    Ok(Json(ExecuteResponse {
        success: true,
        result_id: entry.id.clone(),
        results,
        timestamp: entry.timestamp,
    }))
}

pub(super) async fn batch_execute(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BatchExecuteResponse>, ApiError> {
    let Json(body) = body?;
    let request: RawBatchRequest = serde_json::from_value(body)?;
    if request.devices.is_empty() {
        return Err(ApiError::BadRequest("No devices provided".to_string()));
    }

    let jobs: Vec<BatchJob> = request
        .devices
        .iter()
        .map(|device| {
            let ip_address = device
                .get("ip_address")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let device_name = device
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| ip_address.clone());
            let credentials =
                parse_device(device).map_err(|e| ExecError::validation(e.to_string()));
            BatchJob {
                device_name,
                ip_address,
                credentials,
            }
        })
        .collect();

    info!("Batch execution over {} devices", jobs.len());
    let results = state
        .executor
        .execute_batch(
            jobs,
            explicit_commands(request.commands),
            request.use_basic_commands,
        )
        .await;

    let successful = results
        .iter()
        .filter(|outcome| outcome.status == BatchStatus::Success)
        .count();
    let total = results.len();

    let entry = state
        .results
        .insert(CacheEntry::batch(batch_result_id(), results.clone()))
        .await;

    Ok(Json(BatchExecuteResponse {
        success: true,
        batch_id: entry.id.clone(),
        total,
        successful,
        failed: total - successful,
        results,
        timestamp: entry.timestamp,
    }))
}

pub(super) async fn get_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResultResponse>, ApiError> {
    let entry = state.results.get(&id).await.ok_or(ApiError::NotFound)?;
    Ok(Json(ResultResponse {
        success: true,
        data: (*entry).clone(),
    }))
}

/// Serves the stored entry as a JSON attachment named `<id>.json`.
pub(super) async fn download_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let entry = state.results.get(&id).await.ok_or(ApiError::NotFound)?;
    let body = serde_json::to_vec(&*entry).map_err(|e| ApiError::Internal(e.to_string()))?;
    let disposition = format!("attachment; filename=\"{id}.json\"");
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_fields_are_checked_in_order() {
        let err = require_device_fields(&json!({"username": "admin"})).expect_err("missing");
        assert_eq!(err.to_string(), "Missing required field: ip_address");

        let err = require_device_fields(&json!({
            "ip_address": "10.0.0.5",
            "username": "admin",
            "password": null,
            "device_type": "ciena"
        }))
        .expect_err("null password");
        assert_eq!(err.to_string(), "Missing required field: password");
    }

    #[test]
    fn unknown_device_type_is_a_bad_request() {
        let err = parse_device(&json!({
            "ip_address": "10.0.0.5",
            "username": "admin",
            "password": "x",
            "device_type": "mikrotik"
        }))
        .expect_err("unknown type");
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("mikrotik"));
    }

    #[test]
    fn empty_command_list_defers_to_defaults() {
        assert_eq!(explicit_commands(Vec::new()), None);
        assert_eq!(
            explicit_commands(vec!["show version".to_string()]),
            Some(vec!["show version".to_string()])
        );
    }
}
