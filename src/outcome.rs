//! Command output containers returned by the executor and stored in the cache.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Output of a command run, keyed by command string in execution order.
///
/// Serializes as a JSON object. Running the same command twice keeps the
/// first position and the last output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    entries: Vec<(String, String)>,
}

impl ExecutionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `output` for `command`, replacing any earlier output for it.
    pub fn insert(&mut self, command: impl Into<String>, output: impl Into<String>) {
        let command = command.into();
        let output = output.into();
        match self.entries.iter_mut().find(|(cmd, _)| *cmd == command) {
            Some(entry) => entry.1 = output,
            None => self.entries.push((command, output)),
        }
    }

    pub fn get(&self, command: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(cmd, _)| cmd == command)
            .map(|(_, out)| out.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(command, output)` pairs in execution order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(cmd, out)| (cmd.as_str(), out.as_str()))
    }

    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(cmd, _)| cmd.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ExecutionResult {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut result = ExecutionResult::new();
        for (cmd, out) in iter {
            result.insert(cmd, out);
        }
        result
    }
}

impl Serialize for ExecutionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (cmd, out) in &self.entries {
            map.serialize_entry(cmd, out)?;
        }
        map.end()
    }
}

struct ExecutionResultVisitor;

impl<'de> Visitor<'de> for ExecutionResultVisitor {
    type Value = ExecutionResult;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of command to output")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut result = ExecutionResult::new();
        while let Some((cmd, out)) = access.next_entry::<String, String>()? {
            result.insert(cmd, out);
        }
        Ok(result)
    }
}

impl<'de> Deserialize<'de> for ExecutionResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ExecutionResultVisitor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Success,
    Failed,
}

/// Result for one device of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub device_name: String,
    pub ip_address: String,
    pub status: BatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<ExecutionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchOutcome {
    pub fn success(
        device_name: impl Into<String>,
        ip_address: impl Into<String>,
        results: ExecutionResult,
    ) -> Self {
        Self {
            device_name: device_name.into(),
            ip_address: ip_address.into(),
            status: BatchStatus::Success,
            results: Some(results),
            error: None,
        }
    }

    pub fn failed(
        device_name: impl Into<String>,
        ip_address: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            device_name: device_name.into(),
            ip_address: ip_address.into(),
            status: BatchStatus::Failed,
            results: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == BatchStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_object_in_execution_order() {
        let result: ExecutionResult = [
            ("show version", "v1"),
            ("show system", "up"),
            ("port show", "p1"),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_string(&result).expect("encode");
        assert_eq!(
            json,
            r#"{"show version":"v1","show system":"up","port show":"p1"}"#
        );
    }

    #[test]
    fn duplicate_command_overwrites_in_place() {
        let mut result = ExecutionResult::new();
        result.insert("show clock", "10:00");
        result.insert("show version", "v1");
        result.insert("show clock", "10:01");

        assert_eq!(result.len(), 2);
        assert_eq!(result.get("show clock"), Some("10:01"));
        assert_eq!(
            result.commands().collect::<Vec<_>>(),
            vec!["show clock", "show version"]
        );
    }

    #[test]
    fn deserialization_keeps_document_order() {
        let result: ExecutionResult =
            serde_json::from_str(r#"{"z":"1","a":"2","m":"3"}"#).expect("decode");
        assert_eq!(result.commands().collect::<Vec<_>>(), vec!["z", "a", "m"]);
    }

    #[test]
    fn failed_outcome_omits_results() {
        let outcome = BatchOutcome::failed("core-1", "10.0.0.2", "auth failed");
        let value = serde_json::to_value(&outcome).expect("encode");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"], "auth failed");
        assert!(value.get("results").is_none());
        assert!(!outcome.is_success());
    }

    #[test]
    fn success_outcome_omits_error() {
        let results: ExecutionResult = [("show version", "ok")].into_iter().collect();
        let outcome = BatchOutcome::success("10.0.0.1", "10.0.0.1", results);
        let value = serde_json::to_value(&outcome).expect("encode");
        assert_eq!(value["status"], "success");
        assert_eq!(value["results"]["show version"], "ok");
        assert!(value.get("error").is_none());
    }
}
