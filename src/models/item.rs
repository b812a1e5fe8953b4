//! Inventory item model
//!
//! Transient copies of backend-owned entities: fetched, shown, mutated
//! through the API and dropped again. Nothing here is cached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::scan::ParsedEquipment;

/// A tracked piece of network equipment (`/barang`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: i64,
    pub name: String,
    pub serial_number: String,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Lifecycle status of an item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Available,
    InUse,
    Maintenance,
    Damaged,
    Retired,
    /// Any status this client does not know yet
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Available => write!(f, "available"),
            ItemStatus::InUse => write!(f, "in_use"),
            ItemStatus::Maintenance => write!(f, "maintenance"),
            ItemStatus::Damaged => write!(f, "damaged"),
            ItemStatus::Retired => write!(f, "retired"),
            ItemStatus::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for ItemStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "available" => Ok(ItemStatus::Available),
            "in_use" => Ok(ItemStatus::InUse),
            "maintenance" => Ok(ItemStatus::Maintenance),
            "damaged" => Ok(ItemStatus::Damaged),
            "retired" => Ok(ItemStatus::Retired),
            _ => Err(anyhow::anyhow!("Invalid item status: {}", s)),
        }
    }
}

/// One recorded change on an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(default)]
    pub id: Option<i64>,
    pub action: String,
    #[serde(default)]
    pub from_status: Option<ItemStatus>,
    #[serde(default)]
    pub to_status: Option<ItemStatus>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Input for creating an item
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: String,
    pub serial_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<ParsedEquipment> for NewItem {
    /// Pre-fill the creation form from a decoded scan
    fn from(parsed: ParsedEquipment) -> Self {
        Self {
            name: parsed.suggested_name,
            serial_number: parsed.serial_number,
            mac_address: parsed.mac_address,
            manufacturer: parsed.manufacturer,
            model: parsed.model,
            ..Self::default()
        }
    }
}

/// Input for updating an item
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Body of `PUT /barang/:id/status`
#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Outcome of a spreadsheet import
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// Rows imported
    #[serde(default)]
    pub success: u32,
    /// Rows rejected
    #[serde(default)]
    pub failed: u32,
    /// Human-readable per-row messages
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub failed_items: Vec<FailedImportItem>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.errors.is_empty()
    }
}

/// A rejected spreadsheet row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedImportItem {
    #[serde(default)]
    pub row: Option<u32>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default, alias = "error")]
    pub reason: Option<String>,
}

/// Audit log entry from the admin dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: i64,
    pub action: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One page of activity logs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogPage {
    #[serde(default)]
    pub logs: Vec<ActivityLog>,
    #[serde(default)]
    pub total: u64,
}

/// Inventory counters (`/stats` and `/admin/statistics`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    #[serde(default)]
    pub total_items: u64,
    #[serde(default)]
    pub by_status: HashMap<String, u64>,
    #[serde(default)]
    pub by_manufacturer: HashMap<String, u64>,
    #[serde(default)]
    pub total_users: Option<u64>,
}

/// QR label for an item
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QrCode {
    /// Image as a `data:` URL
    #[serde(alias = "qrCode", alias = "qr")]
    pub data_url: String,
}

/// Backend liveness (`/health`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub database: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TagFormat;

    #[test]
    fn test_unknown_status_does_not_fail_decoding() {
        let status: ItemStatus = serde_json::from_str("\"lost_in_transit\"").unwrap();
        assert_eq!(status, ItemStatus::Unknown);

        let status: ItemStatus = serde_json::from_str("\"in_use\"").unwrap();
        assert_eq!(status, ItemStatus::InUse);
    }

    #[test]
    fn test_item_status_from_str() {
        assert_eq!("Maintenance".parse::<ItemStatus>().unwrap(), ItemStatus::Maintenance);
        assert!("lost".parse::<ItemStatus>().is_err());
    }

    #[test]
    fn test_item_deserializes_with_missing_optionals() {
        let json = r#"{"id":1,"name":"Core switch","serialNumber":"FOC1234X"}"#;
        let item: InventoryItem = serde_json::from_str(json).unwrap();

        assert_eq!(item.serial_number, "FOC1234X");
        assert_eq!(item.status, ItemStatus::Available);
        assert!(item.history.is_empty());
    }

    #[test]
    fn test_new_item_from_parsed_scan() {
        let parsed = ParsedEquipment {
            raw_text: "Model:TL-R480 SN:123456 MAC:AABBCCDDEEFF".to_string(),
            manufacturer: Some("TP-Link".to_string()),
            model: Some("TL-R480".to_string()),
            serial_number: "123456".to_string(),
            mac_address: Some("AABBCCDDEEFF".to_string()),
            suggested_name: "TP-Link TL-R480".to_string(),
            format: TagFormat::TpLink,
        };

        let item = NewItem::from(parsed);

        assert_eq!(item.name, "TP-Link TL-R480");
        assert_eq!(item.serial_number, "123456");
        assert_eq!(item.model.as_deref(), Some("TL-R480"));
        assert_eq!(item.status, ItemStatus::Available);
    }

    #[test]
    fn test_import_report_accepts_error_alias() {
        let json = r#"{"success":4,"failed":1,"errors":["Row 3: duplicate serial"],
            "failedItems":[{"row":3,"serialNumber":"X1","error":"duplicate serial"}]}"#;
        let report: ImportReport = serde_json::from_str(json).unwrap();

        assert!(!report.is_clean());
        assert_eq!(report.failed_items[0].reason.as_deref(), Some("duplicate serial"));
    }
}
