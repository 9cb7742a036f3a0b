//! In-memory store for execution results.
//!
//! Entries live for the life of the process: no eviction, no expiry, no
//! persistence. Memory use grows with every request.

use chrono::{DateTime, Utc};
use log::debug;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::device::{DeviceCredentials, DeviceType};
use crate::outcome::{BatchOutcome, ExecutionResult};

/// Device a single-run entry was collected from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub ip_address: String,
    pub device_type: DeviceType,
}

impl From<&DeviceCredentials> for DeviceSummary {
    fn from(credentials: &DeviceCredentials) -> Self {
        Self {
            ip_address: credentials.ip_address().to_string(),
            device_type: credentials.device_type(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Batch,
}

/// What a cache entry holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CachedPayload {
    Batch {
        #[serde(rename = "type")]
        kind: EntryKind,
        results: Vec<BatchOutcome>,
    },
    Single {
        device: DeviceSummary,
        results: ExecutionResult,
    },
}

/// A stored result, as returned by the results endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: CachedPayload,
}

impl CacheEntry {
    pub fn single(
        id: impl Into<String>,
        credentials: &DeviceCredentials,
        results: ExecutionResult,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp: Utc::now(),
            payload: CachedPayload::Single {
                device: DeviceSummary::from(credentials),
                results,
            },
        }
    }

    pub fn batch(id: impl Into<String>, results: Vec<BatchOutcome>) -> Self {
        Self {
            id: id.into(),
            timestamp: Utc::now(),
            payload: CachedPayload::Batch {
                kind: EntryKind::Batch,
                results,
            },
        }
    }
}

/// Formats a timestamp as `<unix-seconds>.<micros>`.
fn timestamp_key(now: DateTime<Utc>) -> String {
    format!("{}.{:06}", now.timestamp(), now.timestamp_subsec_micros())
}

/// Identifier for a single-device run: `<ip>_<seconds>.<micros>`.
pub fn single_result_id(ip_address: &str) -> String {
    format!("{}_{}", ip_address, timestamp_key(Utc::now()))
}

/// Identifier for a batch run: `batch_<seconds>.<micros>`.
pub fn batch_result_id() -> String {
    format!("batch_{}", timestamp_key(Utc::now()))
}

/// Shared, concurrently accessible result store. Cheap to clone.
#[derive(Clone)]
pub struct ResultStore {
    cache: Cache<String, Arc<CacheEntry>>,
}

impl ResultStore {
    /// Creates an empty store with no capacity bound and no expiry.
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().build(),
        }
    }

    /// Stores `entry` under its id, replacing anything already there.
    pub async fn insert(&self, entry: CacheEntry) -> Arc<CacheEntry> {
        let entry = Arc::new(entry);
        self.cache.insert(entry.id.clone(), entry.clone()).await;
        debug!("Cached result {}", entry.id);
        entry
    }

    pub async fn get(&self, id: &str) -> Option<Arc<CacheEntry>> {
        self.cache.get(id).await
    }

    /// Number of stored entries.
    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_credentials() -> DeviceCredentials {
        DeviceCredentials::new("10.0.0.5", "admin", "x", DeviceType::BrocadeIcx)
    }

    #[test]
    fn single_ids_start_with_the_ip() {
        let id = single_result_id("10.0.0.5");
        let (ip, ts) = id.split_once('_').expect("separator");
        assert_eq!(ip, "10.0.0.5");
        let (secs, micros) = ts.split_once('.').expect("fraction");
        assert!(secs.parse::<i64>().is_ok());
        assert_eq!(micros.len(), 6);
    }

    #[test]
    fn batch_ids_are_prefixed() {
        assert!(batch_result_id().starts_with("batch_"));
    }

    #[test]
    fn single_entry_serializes_device_metadata() {
        let results: ExecutionResult = [("show version", "ok")].into_iter().collect();
        let entry = CacheEntry::single("10.0.0.5_1.000000", &sample_credentials(), results);
        let value = serde_json::to_value(&entry).expect("encode");

        assert_eq!(value["id"], "10.0.0.5_1.000000");
        assert_eq!(value["device"]["ip_address"], "10.0.0.5");
        assert_eq!(value["device"]["device_type"], "brocade_icx");
        assert_eq!(value["results"]["show version"], "ok");
        assert!(value.get("type").is_none());
    }

    #[test]
    fn batch_entry_is_marked() {
        let entry = CacheEntry::batch(
            "batch_1.000000",
            vec![BatchOutcome::failed("r1", "10.0.0.1", "timeout")],
        );
        let value = serde_json::to_value(&entry).expect("encode");
        assert_eq!(value["type"], "batch");
        assert_eq!(value["results"][0]["status"], "failed");
    }

    #[test]
    fn entries_decode_back_to_the_right_variant() {
        let results: ExecutionResult = [("show version", "ok")].into_iter().collect();
        let single = CacheEntry::single("a", &sample_credentials(), results);
        let decoded: CacheEntry =
            serde_json::from_str(&serde_json::to_string(&single).expect("encode")).expect("decode");
        assert_eq!(decoded, single);

        let batch = CacheEntry::batch("b", vec![BatchOutcome::failed("r1", "10.0.0.1", "x")]);
        let decoded: CacheEntry =
            serde_json::from_str(&serde_json::to_string(&batch).expect("encode")).expect("decode");
        assert_eq!(decoded, batch);
    }

    #[tokio::test]
    async fn store_counts_and_returns_entries() {
        let store = ResultStore::new();
        assert!(store.is_empty().await);

        let entry = CacheEntry::batch("batch_1.000001", Vec::new());
        store.insert(entry.clone()).await;

        assert_eq!(store.len().await, 1);
        let fetched = store.get("batch_1.000001").await.expect("present");
        assert_eq!(*fetched, entry);
        assert!(store.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn concurrent_inserts_are_all_kept() {
        let store = ResultStore::new();
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .insert(CacheEntry::batch(format!("batch_{i}"), Vec::new()))
                    .await;
            }));
        }
        for handle in handles {
            handle.await.expect("join");
        }
        assert_eq!(store.len().await, 16);
    }
}
