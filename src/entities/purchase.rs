// 🛒 Purchase Entity
// A chicken purchase is the only record that triggers coop rotation

use super::text_enum;
use crate::config::FarmConfig;
use crate::schema::{FieldChecks, ValidationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

text_enum! {
    pub enum PurchaseType {
        /// New chicks; enters the last coop slot
        #[serde(alias = "pollo")]
        Chicken => "chicken",
        #[serde(alias = "alimento")]
        Feed => "feed",
        #[serde(alias = "medicamento")]
        Medicine => "medicine",
        #[serde(alias = "equipo")]
        Equipment => "equipment",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: i64,
    #[serde(rename = "type")]
    pub purchase_type: PurchaseType,
    pub quantity: i64,
    pub price: f64,
    pub supplier: String,
    pub notes: Option<String>,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPurchase {
    #[serde(rename = "type")]
    pub purchase_type: PurchaseType,
    pub quantity: i64,
    pub price: f64,
    pub supplier: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewPurchase {
    pub fn validate(&self, config: &FarmConfig) -> ValidationResult {
        FieldChecks::new("Purchase", config)
            .positive_count("quantity", self.quantity)
            .amount("price", self.price)
            .required_text("supplier", &self.supplier)
            .finish()
    }

    pub fn triggers_rotation(&self) -> bool {
        self.purchase_type == PurchaseType::Chicken
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spanish_type_alias() {
        let input: NewPurchase = serde_json::from_str(
            r#"{"type": "pollo", "quantity": 500, "price": 7500.0, "supplier": "Avícola Central"}"#,
        )
        .unwrap();

        assert_eq!(input.purchase_type, PurchaseType::Chicken);
        assert!(input.triggers_rotation());
        assert_eq!(input.notes, None);
    }

    #[test]
    fn test_feed_does_not_rotate() {
        let input: NewPurchase = serde_json::from_str(
            r#"{"type": "feed", "quantity": 20, "price": 950.5, "supplier": "Molinos", "notes": "sacos de 100 lb"}"#,
        )
        .unwrap();

        assert!(!input.triggers_rotation());
        assert_eq!(input.notes.as_deref(), Some("sacos de 100 lb"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result: Result<NewPurchase, _> = serde_json::from_str(
            r#"{"type": "ducks", "quantity": 1, "price": 1.0, "supplier": "x"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validation() {
        let input = NewPurchase {
            purchase_type: PurchaseType::Chicken,
            quantity: 0,
            price: -3.0,
            supplier: "".to_string(),
            notes: None,
        };

        let errors = input.validate(&FarmConfig::default()).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["quantity", "price", "supplier"]);
    }

    #[test]
    fn test_serializes_type_field() {
        let purchase = Purchase {
            id: 1,
            purchase_type: PurchaseType::Medicine,
            quantity: 2,
            price: 180.0,
            supplier: "Agroveterinaria".to_string(),
            notes: None,
            date: Utc::now(),
        };
        let json = serde_json::to_value(&purchase).unwrap();
        assert_eq!(json["type"], "medicine");
        assert!(json["notes"].is_null());
    }
}
