// Entity Models - the six record types the farm keeps
//
// Each entity has:
// - A stored record (what the store returns and the API serializes)
// - A New* input validated before insert
// - An *Update input for the records that can be edited

use thiserror::Error;

/// Text stored in a column did not match any known variant
#[derive(Debug, Clone, Error, PartialEq)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Closed set of text values stored as TEXT columns and sent as JSON strings.
/// Extra `#[serde(alias = ..)]` attributes on a variant accept the farm's
/// Spanish labels on input.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text, )+
                }
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::entities::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok($name::$variant), )+
                    _ => Err($crate::entities::UnknownVariant {
                        kind: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use text_enum;

pub mod coop;
pub mod purchase;
pub mod expense;
pub mod activity;
pub mod invoice;
pub mod mortality;

pub use coop::{Coop, CoopStatus, CoopUpdate};
pub use purchase::{NewPurchase, Purchase, PurchaseType};
pub use expense::{Expense, ExpenseCategory, NewExpense};
pub use activity::{Activity, ActivityType, ActivityUpdate, NewActivity};
pub use invoice::{format_invoice_number, Invoice, InvoiceStatus, InvoiceUpdate, NewInvoice};
pub use mortality::{Mortality, MortalityCause, NewMortality};

/// Timestamps in input bodies: RFC 3339 or a bare `YYYY-MM-DD` (midnight UTC)
pub(crate) mod flexible_date {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{de, Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid date '{}'", raw)))
    }

    /// Same as `deserialize` for optional fields (`null` or absent = None)
    pub mod option {
        use super::*;

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(raw) => parse(&raw)
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("invalid date '{}'", raw))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_flexible_date_accepts_both_forms() {
        let plain = flexible_date::parse("2024-11-15").unwrap();
        assert_eq!(plain, Utc.with_ymd_and_hms(2024, 11, 15, 0, 0, 0).unwrap());

        let full = flexible_date::parse("2024-11-15T08:30:00-06:00").unwrap();
        assert_eq!(full, Utc.with_ymd_and_hms(2024, 11, 15, 14, 30, 0).unwrap());

        assert!(flexible_date::parse("15/11/2024").is_none());
    }

    #[test]
    fn test_unknown_variant_message() {
        let err = "pato".parse::<PurchaseType>().unwrap_err();
        assert_eq!(err.to_string(), "unknown PurchaseType value 'pato'");
    }
}
