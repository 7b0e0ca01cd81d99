// 🧾 Invoice Entity - chickens sold by weight
//
// total is always pounds × pricePerPound (rounded to cents); callers never
// send it. The number comes from the store's durable sequence.

use super::text_enum;
use crate::config::FarmConfig;
use crate::schema::{round_cents, FieldChecks, ValidationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

text_enum! {
    pub enum InvoiceStatus {
        #[serde(alias = "pagado", alias = "pagada")]
        Paid => "paid",
        #[serde(alias = "pendiente")]
        Pending => "pending",
        #[serde(alias = "cancelado", alias = "cancelada")]
        Cancelled => "cancelled",
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Paid
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: i64,
    pub invoice_number: String,
    pub client_name: String,
    pub client_phone: Option<String>,
    pub concept: String,
    /// Birds sold
    pub quantity: i64,
    pub pounds: f64,
    pub price_per_pound: f64,
    pub total: f64,
    pub status: InvoiceStatus,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoice {
    pub client_name: String,
    #[serde(default)]
    pub client_phone: Option<String>,
    pub concept: String,
    pub quantity: i64,
    pub pounds: f64,
    pub price_per_pound: f64,
    #[serde(default)]
    pub status: InvoiceStatus,
}

impl NewInvoice {
    pub fn validate(&self, config: &FarmConfig) -> ValidationResult {
        FieldChecks::new("Invoice", config)
            .required_text("clientName", &self.client_name)
            .required_text("concept", &self.concept)
            .positive_count("quantity", self.quantity)
            .amount("pounds", self.pounds)
            .amount("pricePerPound", self.price_per_pound)
            .finite_product("total", self.pounds, self.price_per_pound)
            .finish()
    }

    pub fn total(&self) -> f64 {
        invoice_total(self.pounds, self.price_per_pound)
    }
}

/// Partial update from `PUT /api/invoices/:id`. Stock is not touched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceUpdate {
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_phone: Option<String>,
    #[serde(default)]
    pub concept: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub pounds: Option<f64>,
    #[serde(default)]
    pub price_per_pound: Option<f64>,
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
}

impl InvoiceUpdate {
    pub fn validate(&self, config: &FarmConfig) -> ValidationResult {
        let mut checks = FieldChecks::new("Invoice", config);
        if let Some(name) = &self.client_name {
            checks.required_text("clientName", name);
        }
        if let Some(concept) = &self.concept {
            checks.required_text("concept", concept);
        }
        if let Some(quantity) = self.quantity {
            checks.positive_count("quantity", quantity);
        }
        if let Some(pounds) = self.pounds {
            checks.amount("pounds", pounds);
        }
        if let Some(price) = self.price_per_pound {
            checks.amount("pricePerPound", price);
        }
        if let (Some(pounds), Some(price)) = (self.pounds, self.price_per_pound) {
            checks.finite_product("total", pounds, price);
        }
        checks.finish()
    }

    /// Checks the merged invoice, where one factor may come from the stored row
    pub fn validate_merged(&self, merged: &Invoice, config: &FarmConfig) -> ValidationResult {
        FieldChecks::new("Invoice", config)
            .finite_product("total", merged.pounds, merged.price_per_pound)
            .finish()
    }

    /// Merge onto an existing invoice, recomputing the total
    pub fn apply_to(&self, invoice: &Invoice) -> Invoice {
        let pounds = self.pounds.unwrap_or(invoice.pounds);
        let price_per_pound = self.price_per_pound.unwrap_or(invoice.price_per_pound);

        Invoice {
            id: invoice.id,
            invoice_number: invoice.invoice_number.clone(),
            client_name: self
                .client_name
                .clone()
                .unwrap_or_else(|| invoice.client_name.clone()),
            client_phone: self
                .client_phone
                .clone()
                .or_else(|| invoice.client_phone.clone()),
            concept: self
                .concept
                .clone()
                .unwrap_or_else(|| invoice.concept.clone()),
            quantity: self.quantity.unwrap_or(invoice.quantity),
            pounds,
            price_per_pound,
            total: invoice_total(pounds, price_per_pound),
            status: self.status.unwrap_or(invoice.status),
            date: invoice.date,
        }
    }
}

pub fn invoice_total(pounds: f64, price_per_pound: f64) -> f64 {
    round_cents(pounds * price_per_pound)
}

/// `Fact-0001` style number for a sequence value
pub fn format_invoice_number(config: &FarmConfig, sequence: i64) -> String {
    format!(
        "{}-{:0width$}",
        config.invoice_prefix,
        sequence,
        width = config.invoice_digits
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_invoice() -> Invoice {
        Invoice {
            id: 1,
            invoice_number: "Fact-0001".to_string(),
            client_name: "Pollería Doña Marta".to_string(),
            client_phone: None,
            concept: "Pollo en pie".to_string(),
            quantity: 20,
            pounds: 100.0,
            price_per_pound: 12.5,
            total: 1250.0,
            status: InvoiceStatus::Paid,
            date: Utc::now(),
        }
    }

    #[test]
    fn test_total_is_pounds_times_price() {
        let input: NewInvoice = serde_json::from_str(
            r#"{"clientName": "Pollería Doña Marta", "concept": "Pollo en pie",
                "quantity": 20, "pounds": 100, "pricePerPound": 12.50}"#,
        )
        .unwrap();

        assert_eq!(input.total(), 1250.0);
        assert_eq!(input.status, InvoiceStatus::Paid);
        assert!(input.validate(&FarmConfig::default()).is_ok());
    }

    #[test]
    fn test_total_rounded_to_cents() {
        assert_eq!(invoice_total(3.3, 12.34), 40.72);
    }

    #[test]
    fn test_invoice_number_format() {
        let config = FarmConfig::default();
        assert_eq!(format_invoice_number(&config, 1), "Fact-0001");
        assert_eq!(format_invoice_number(&config, 42), "Fact-0042");
        assert_eq!(format_invoice_number(&config, 12345), "Fact-12345");

        let custom = FarmConfig {
            invoice_prefix: "INV".to_string(),
            invoice_digits: 6,
            ..FarmConfig::default()
        };
        assert_eq!(format_invoice_number(&custom, 7), "INV-000007");
    }

    #[test]
    fn test_update_recomputes_total() {
        let update: InvoiceUpdate = serde_json::from_str(r#"{"pounds": 80}"#).unwrap();
        let updated = update.apply_to(&sample_invoice());

        assert_eq!(updated.pounds, 80.0);
        assert_eq!(updated.total, 1000.0);
        assert_eq!(updated.invoice_number, "Fact-0001");
    }

    #[test]
    fn test_update_status_alias() {
        let update: InvoiceUpdate = serde_json::from_str(r#"{"status": "cancelado"}"#).unwrap();
        let updated = update.apply_to(&sample_invoice());
        assert_eq!(updated.status, InvoiceStatus::Cancelled);
        assert_eq!(updated.total, 1250.0);
    }

    #[test]
    fn test_validation() {
        let input = NewInvoice {
            client_name: "".to_string(),
            client_phone: None,
            concept: "Pollo".to_string(),
            quantity: 0,
            pounds: 10.0,
            price_per_pound: f64::INFINITY,
            status: InvoiceStatus::Pending,
        };
        let errors = input.validate(&FarmConfig::default()).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["clientName", "quantity", "pricePerPound"]);
    }

    #[test]
    fn test_infinite_total_rejected() {
        let input: NewInvoice = serde_json::from_str(
            r#"{"clientName": "Cliente", "concept": "Pollo",
                "quantity": 1, "pounds": 1e200, "pricePerPound": 1e200}"#,
        )
        .unwrap();
        let errors = input.validate(&FarmConfig::default()).unwrap_err();
        assert_eq!(errors[0].field, "total");

        let update: InvoiceUpdate =
            serde_json::from_str(r#"{"pounds": 1e200, "pricePerPound": 1e200}"#).unwrap();
        assert!(update.validate(&FarmConfig::default()).is_err());

        let update: InvoiceUpdate = serde_json::from_str(r#"{"pounds": 1e308}"#).unwrap();
        assert!(update.validate(&FarmConfig::default()).is_ok());
        let merged = update.apply_to(&sample_invoice());
        assert!(update.validate_merged(&merged, &FarmConfig::default()).is_err());
    }
}
