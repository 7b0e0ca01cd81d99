// 🐔 Coop Entity - one slot of the growth pipeline
//
// Slots are numbered 1..=coop_count and never change number; only the batch
// they hold (quantity + entry date) and their status move.

use super::text_enum;
use crate::config::FarmConfig;
use crate::schema::{FieldChecks, ValidationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

text_enum! {
    pub enum CoopStatus {
        #[serde(alias = "activo")]
        Active => "active",
        #[serde(alias = "inactivo")]
        Inactive => "inactive",
    }
}

impl Default for CoopStatus {
    fn default() -> Self {
        CoopStatus::Active
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coop {
    pub id: i64,
    /// Slot number in the rotation pipeline (1 = oldest batch)
    pub number: i64,
    pub quantity: i64,
    /// When the batch currently in this slot arrived
    pub entry_date: DateTime<Utc>,
    pub status: CoopStatus,
}

/// Partial update from `PUT /api/coops/:id`; absent fields are left as they are
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoopUpdate {
    #[serde(default)]
    pub quantity: Option<i64>,

    #[serde(default, deserialize_with = "super::flexible_date::option::deserialize")]
    pub entry_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub status: Option<CoopStatus>,
}

impl CoopUpdate {
    pub fn validate(&self, config: &FarmConfig) -> ValidationResult {
        let mut checks = FieldChecks::new("Coop", config);
        if let Some(quantity) = self.quantity {
            checks.non_negative_count("quantity", quantity);
        }
        checks.finish()
    }

    /// Merge onto an existing coop
    pub fn apply_to(&self, coop: &Coop) -> Coop {
        Coop {
            quantity: self.quantity.unwrap_or(coop.quantity),
            entry_date: self.entry_date.unwrap_or(coop.entry_date),
            status: self.status.unwrap_or(coop.status),
            ..coop.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_coop() -> Coop {
        Coop {
            id: 3,
            number: 3,
            quantity: 420,
            entry_date: Utc.with_ymd_and_hms(2024, 11, 5, 0, 0, 0).unwrap(),
            status: CoopStatus::Active,
        }
    }

    #[test]
    fn test_partial_update_keeps_absent_fields() {
        let update: CoopUpdate = serde_json::from_str(r#"{"quantity": 400}"#).unwrap();
        let updated = update.apply_to(&sample_coop());

        assert_eq!(updated.quantity, 400);
        assert_eq!(updated.number, 3);
        assert_eq!(updated.entry_date, sample_coop().entry_date);
        assert_eq!(updated.status, CoopStatus::Active);
    }

    #[test]
    fn test_update_accepts_plain_date_and_spanish_status() {
        let update: CoopUpdate =
            serde_json::from_str(r#"{"entryDate": "2024-12-01", "status": "inactivo"}"#).unwrap();
        let updated = update.apply_to(&sample_coop());

        assert_eq!(
            updated.entry_date,
            Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(updated.status, CoopStatus::Inactive);
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let update = CoopUpdate {
            quantity: Some(-5),
            ..CoopUpdate::default()
        };
        let errors = update.validate(&FarmConfig::default()).unwrap_err();
        assert_eq!(errors[0].field, "quantity");
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(sample_coop()).unwrap();
        assert_eq!(json["entryDate"], "2024-11-05T00:00:00Z");
        assert_eq!(json["status"], "active");
        assert_eq!(json["quantity"], 420);
    }
}
