//! Default diagnostic command sets.
//!
//! Each device family has an ordered list of read-only `show` style commands
//! that give a quick health picture of the box. These are what a request gets
//! when it asks for `use_basic_commands`.

use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::device::DeviceType;

static BASIC_COMMANDS: Lazy<HashMap<DeviceType, Vec<&'static str>>> = Lazy::new(|| {
    HashMap::from([
        (
            DeviceType::Ciena,
            vec![
                "software show",
                "system show",
                "port show",
                "configuration show",
            ],
        ),
        (
            DeviceType::BrocadeCes,
            vec![
                "show version",
                "show system",
                "show running-config",
                "show interface brief",
            ],
        ),
        (
            DeviceType::BrocadeIcx,
            vec![
                "show version",
                "show running-config",
                "show interface brief",
                "show ip interface brief",
            ],
        ),
        (
            DeviceType::BrocadeFws,
            vec!["show version", "show system", "show interface status"],
        ),
        (
            DeviceType::Alcatel7210,
            vec![
                "show version",
                "show system information",
                "show router interface",
                "show card state",
            ],
        ),
    ])
});

/// Catalog entry describing one device family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeviceTypeInfo {
    /// Wire value accepted by the API, e.g. `brocade_icx`.
    pub value: String,
    /// Human readable label, e.g. `Brocade Icx`.
    pub label: String,
}

impl From<DeviceType> for DeviceTypeInfo {
    fn from(device_type: DeviceType) -> Self {
        Self {
            value: device_type.as_str().to_string(),
            label: device_type.label(),
        }
    }
}

/// Returns all device families in declaration order.
pub fn catalog() -> Vec<DeviceTypeInfo> {
    DeviceType::ALL.into_iter().map(DeviceTypeInfo::from).collect()
}

/// Returns the default commands for a device type, in execution order.
///
/// A family with nothing configured yields an empty list.
pub fn default_commands(device_type: DeviceType) -> Vec<String> {
    BASIC_COMMANDS
        .get(&device_type)
        .map(|cmds| cmds.iter().map(|c| c.to_string()).collect())
        .unwrap_or_default()
}

/// Looks up default commands by wire name (case-insensitive).
///
/// Unknown names yield an empty list rather than an error.
pub fn default_commands_for(name: &str) -> Vec<String> {
    name.parse::<DeviceType>()
        .map(default_commands)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_device_type_has_default_commands() {
        for dt in DeviceType::ALL {
            assert!(!default_commands(dt).is_empty(), "no commands for {dt}");
        }
    }

    #[test]
    fn brocade_icx_commands_keep_their_order() {
        assert_eq!(
            default_commands(DeviceType::BrocadeIcx),
            vec![
                "show version",
                "show running-config",
                "show interface brief",
                "show ip interface brief",
            ]
        );
    }

    #[test]
    fn brocade_fws_has_three_commands() {
        assert_eq!(default_commands(DeviceType::BrocadeFws).len(), 3);
    }

    #[test]
    fn lookup_by_name_is_case_insensitive() {
        assert_eq!(
            default_commands_for("CIENA"),
            default_commands(DeviceType::Ciena)
        );
    }

    #[test]
    fn unknown_name_yields_empty_list() {
        assert!(default_commands_for("mikrotik").is_empty());
        assert!(default_commands_for("").is_empty());
    }

    #[test]
    fn catalog_lists_all_types_with_labels() {
        let entries = catalog();
        assert_eq!(entries.len(), DeviceType::ALL.len());
        assert_eq!(entries[0].value, "ciena");
        assert!(entries.iter().any(|e| e.value == "alcatel_7210" && e.label == "Alcatel 7210"));
    }
}
