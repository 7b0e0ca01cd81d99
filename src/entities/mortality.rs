// 🪦 Mortality Entity - deaths recorded against one coop

use super::text_enum;
use crate::config::FarmConfig;
use crate::schema::{FieldChecks, ValidationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

text_enum! {
    pub enum MortalityCause {
        #[serde(alias = "enfermedad")]
        Disease => "disease",
        #[serde(alias = "accidente")]
        Accident => "accident",
        Natural => "natural",
        #[serde(alias = "desconocida")]
        Unknown => "unknown",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mortality {
    pub id: i64,
    pub coop_number: i64,
    pub quantity: i64,
    pub cause: MortalityCause,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMortality {
    pub coop_number: i64,
    pub quantity: i64,
    pub cause: MortalityCause,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewMortality {
    pub fn validate(&self, config: &FarmConfig) -> ValidationResult {
        FieldChecks::new("Mortality", config)
            .coop_number("coopNumber", self.coop_number)
            .positive_count("quantity", self.quantity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spanish_cause() {
        let input: NewMortality = serde_json::from_str(
            r#"{"coopNumber": 3, "quantity": 50, "cause": "enfermedad"}"#,
        )
        .unwrap();

        assert_eq!(input.cause, MortalityCause::Disease);
        assert!(input.validate(&FarmConfig::default()).is_ok());
    }

    #[test]
    fn test_coop_outside_pipeline_rejected() {
        let input = NewMortality {
            coop_number: 8,
            quantity: 5,
            cause: MortalityCause::Natural,
            description: None,
        };
        let errors = input.validate(&FarmConfig::default()).unwrap_err();
        assert_eq!(errors[0].field, "coopNumber");

        let wider = FarmConfig {
            coop_count: 8,
            ..FarmConfig::default()
        };
        assert!(input.validate(&wider).is_ok());
    }
}
