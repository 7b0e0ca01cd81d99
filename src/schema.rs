// 📐 Shape Layer - Input Validation
// Field checks shared by every record type before it reaches the store

use crate::config::FarmConfig;

/// Largest bird count any single record may carry
pub const MAX_COUNT: i64 = u32::MAX as i64;

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub context: String,
}

impl ValidationError {
    pub fn new(context: &str, field: &str, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.to_string(),
            message: message.into(),
            context: context.to_string(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.context, self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), Vec<ValidationError>>;

// ============================================================================
// FIELD CHECKS
// ============================================================================

/// Collects every failing field of one record instead of stopping at the first
pub struct FieldChecks<'a> {
    context: &'static str,
    config: &'a FarmConfig,
    errors: Vec<ValidationError>,
}

impl<'a> FieldChecks<'a> {
    pub fn new(context: &'static str, config: &'a FarmConfig) -> Self {
        FieldChecks {
            context,
            config,
            errors: Vec::new(),
        }
    }

    fn fail(&mut self, field: &str, message: String) {
        self.errors
            .push(ValidationError::new(self.context, field, message));
    }

    pub fn required_text(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.fail(field, "Required field is empty".to_string());
        }
        self
    }

    pub fn positive_count(&mut self, field: &str, value: i64) -> &mut Self {
        if value <= 0 {
            self.fail(field, format!("Must be greater than 0, got {}", value));
        } else if value > MAX_COUNT {
            self.fail(field, format!("Must be at most {}, got {}", MAX_COUNT, value));
        }
        self
    }

    pub fn non_negative_count(&mut self, field: &str, value: i64) -> &mut Self {
        if value < 0 {
            self.fail(field, format!("Must not be negative, got {}", value));
        } else if value > MAX_COUNT {
            self.fail(field, format!("Must be at most {}, got {}", MAX_COUNT, value));
        }
        self
    }

    pub fn amount(&mut self, field: &str, value: f64) -> &mut Self {
        if !value.is_finite() {
            self.fail(field, "Must be a finite number".to_string());
        } else if value < 0.0 {
            self.fail(field, format!("Must not be negative, got {}", value));
        }
        self
    }

    /// Finite factors can still multiply out to infinity
    pub fn finite_product(&mut self, field: &str, left: f64, right: f64) -> &mut Self {
        if left.is_finite() && right.is_finite() && !(left * right).is_finite() {
            self.fail(field, "Must be a finite number".to_string());
        }
        self
    }

    pub fn coop_number(&mut self, field: &str, value: i64) -> &mut Self {
        let max = i64::from(self.config.coop_count);
        if value < 1 || value > max {
            self.fail(
                field,
                format!("Must be a coop number between 1 and {}, got {}", max, value),
            );
        }
        self
    }

    pub fn finish(&mut self) -> ValidationResult {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }
}

/// Round a money amount to cents
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checks_collect_all_errors() {
        let config = FarmConfig::default();
        let result = FieldChecks::new("Mortality", &config)
            .required_text("description", "   ")
            .positive_count("quantity", 0)
            .coop_number("coopNumber", 8)
            .finish();

        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].field, "description");
        assert_eq!(errors[1].message, "Must be greater than 0, got 0");
        assert_eq!(
            errors[2].to_string(),
            "[Mortality] coopNumber: Must be a coop number between 1 and 7, got 8"
        );
    }

    #[test]
    fn test_checks_pass() {
        let config = FarmConfig::default();
        let result = FieldChecks::new("Expense", &config)
            .required_text("description", "Cambio de bebederos")
            .amount("amount", 0.0)
            .non_negative_count("quantity", 0)
            .coop_number("coopNumber", 7)
            .finish();

        assert!(result.is_ok());
    }

    #[test]
    fn test_amount_rejects_nan_and_negative() {
        let config = FarmConfig::default();
        let errors = FieldChecks::new("Purchase", &config)
            .amount("price", f64::NAN)
            .amount("price", -1.5)
            .finish()
            .unwrap_err();

        assert_eq!(errors[0].message, "Must be a finite number");
        assert_eq!(errors[1].message, "Must not be negative, got -1.5");
    }

    #[test]
    fn test_counts_capped() {
        let config = FarmConfig::default();
        let errors = FieldChecks::new("Purchase", &config)
            .positive_count("quantity", i64::MAX)
            .non_negative_count("quantity", MAX_COUNT + 1)
            .positive_count("quantity", MAX_COUNT)
            .finish()
            .unwrap_err();

        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.starts_with("Must be at most 4294967295"));
    }

    #[test]
    fn test_finite_product() {
        let config = FarmConfig::default();
        let errors = FieldChecks::new("Invoice", &config)
            .finite_product("total", 1e200, 1e200)
            .finite_product("total", 100.0, 12.5)
            .finite_product("total", f64::NAN, 2.0)
            .finish()
            .unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "total");
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(1250.0), 1250.0);
        assert_eq!(round_cents(10.0 * 0.333), 3.33);
        assert_eq!(round_cents(12.345678), 12.35);
    }
}
