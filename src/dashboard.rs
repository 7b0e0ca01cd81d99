// 📊 Dashboard - figures derived from the stored records
// Nothing here is persisted; everything is recomputed from the lists

use crate::entities::{Coop, CoopStatus, Expense, Invoice, InvoiceStatus, Mortality};
use crate::schema::round_cents;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Upper bound (inclusive) in days for a young batch
pub const YOUNG_MAX_DAYS: i64 = 21;
/// Upper bound (inclusive) in days for a medium batch
pub const MEDIUM_MAX_DAYS: i64 = 35;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeCategory {
    Young,
    Medium,
    Old,
}

impl AgeCategory {
    pub fn from_days(days: i64) -> Self {
        if days <= YOUNG_MAX_DAYS {
            AgeCategory::Young
        } else if days <= MEDIUM_MAX_DAYS {
            AgeCategory::Medium
        } else {
            AgeCategory::Old
        }
    }
}

/// Whole days between entry and now, rounded up
pub fn age_in_days(entry_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (now - entry_date).num_milliseconds().abs();
    (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoopAge {
    pub number: i64,
    pub quantity: i64,
    pub status: CoopStatus,
    pub age_days: i64,
    pub age_category: AgeCategory,
}

impl CoopAge {
    pub fn of(coop: &Coop, now: DateTime<Utc>) -> Self {
        let age_days = age_in_days(coop.entry_date, now);
        CoopAge {
            number: coop.number,
            quantity: coop.quantity,
            status: coop.status,
            age_days,
            age_category: AgeCategory::from_days(age_days),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_chickens: i64,
    pub active_coops: usize,
    pub coops: Vec<CoopAge>,
    /// Paid invoices dated today (UTC)
    pub sales_today: f64,
    pub sales_this_month: f64,
    pub pending_invoices: usize,
    pub expenses_this_month: f64,
    /// Birds lost this month
    pub mortalities_this_month: i64,
    /// Birds lost since records began
    pub total_mortalities: i64,
}

impl DashboardSummary {
    pub fn build(
        coops: &[Coop],
        invoices: &[Invoice],
        expenses: &[Expense],
        mortalities: &[Mortality],
        now: DateTime<Utc>,
    ) -> Self {
        let same_month =
            |date: &DateTime<Utc>| date.year() == now.year() && date.month() == now.month();
        let same_day = |date: &DateTime<Utc>| date.date_naive() == now.date_naive();
        let paid = invoices
            .iter()
            .filter(|inv| inv.status == InvoiceStatus::Paid);

        DashboardSummary {
            total_chickens: saturating_sum(coops.iter().map(|c| c.quantity)),
            active_coops: coops
                .iter()
                .filter(|c| c.status == CoopStatus::Active)
                .count(),
            coops: coops.iter().map(|c| CoopAge::of(c, now)).collect(),
            sales_today: round_cents(
                paid
                    .clone()
                    .filter(|inv| same_day(&inv.date))
                    .map(|inv| inv.total)
                    .sum(),
            ),
            sales_this_month: round_cents(
                paid
                    .filter(|inv| same_month(&inv.date))
                    .map(|inv| inv.total)
                    .sum(),
            ),
            pending_invoices: invoices
                .iter()
                .filter(|inv| inv.status == InvoiceStatus::Pending)
                .count(),
            expenses_this_month: round_cents(
                expenses
                    .iter()
                    .filter(|e| same_month(&e.date))
                    .map(|e| e.amount)
                    .sum(),
            ),
            mortalities_this_month: saturating_sum(
                mortalities
                    .iter()
                    .filter(|m| same_month(&m.date))
                    .map(|m| m.quantity),
            ),
            total_mortalities: saturating_sum(mortalities.iter().map(|m| m.quantity)),
        }
    }
}

/// Bird counts pinned at i64::MAX instead of overflowing
pub fn saturating_sum(counts: impl Iterator<Item = i64>) -> i64 {
    counts.fold(0, i64::saturating_add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ExpenseCategory, MortalityCause};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 10, 15, 0, 0).unwrap()
    }

    fn coop(number: i64, quantity: i64, entry_date: DateTime<Utc>, status: CoopStatus) -> Coop {
        Coop {
            id: number,
            number,
            quantity,
            entry_date,
            status,
        }
    }

    fn invoice(total: f64, date: DateTime<Utc>, status: InvoiceStatus) -> Invoice {
        Invoice {
            id: 1,
            invoice_number: "Fact-0001".to_string(),
            client_name: "Cliente".to_string(),
            client_phone: None,
            concept: "Pollo".to_string(),
            quantity: 10,
            pounds: total / 12.5,
            price_per_pound: 12.5,
            total,
            status,
            date,
        }
    }

    #[test]
    fn test_age_rounds_up_partial_days() {
        let entry = now() - Duration::hours(30);
        assert_eq!(age_in_days(entry, now()), 2);
        assert_eq!(age_in_days(now(), now()), 0);
        assert_eq!(age_in_days(now() - Duration::days(21), now()), 21);
        // future entry dates count the same distance
        assert_eq!(age_in_days(now() + Duration::days(3), now()), 3);
    }

    #[test]
    fn test_age_categories() {
        assert_eq!(AgeCategory::from_days(0), AgeCategory::Young);
        assert_eq!(AgeCategory::from_days(21), AgeCategory::Young);
        assert_eq!(AgeCategory::from_days(22), AgeCategory::Medium);
        assert_eq!(AgeCategory::from_days(35), AgeCategory::Medium);
        assert_eq!(AgeCategory::from_days(36), AgeCategory::Old);
    }

    #[test]
    fn test_summary() {
        let coops = vec![
            coop(1, 450, now() - Duration::days(40), CoopStatus::Active),
            coop(2, 380, now() - Duration::days(25), CoopStatus::Active),
            coop(3, 0, now() - Duration::days(2), CoopStatus::Inactive),
        ];
        let last_month = Utc.with_ymd_and_hms(2024, 11, 30, 12, 0, 0).unwrap();
        let earlier_today = now() - Duration::hours(2);
        let invoices = vec![
            invoice(1250.0, earlier_today, InvoiceStatus::Paid),
            invoice(500.0, now() - Duration::days(3), InvoiceStatus::Pending),
            invoice(900.0, earlier_today, InvoiceStatus::Cancelled),
            invoice(700.0, last_month, InvoiceStatus::Paid),
        ];
        let expenses = vec![
            Expense {
                id: 1,
                category: ExpenseCategory::Utilities,
                description: "Energía".to_string(),
                amount: 1200.5,
                date: now() - Duration::days(1),
            },
            Expense {
                id: 2,
                category: ExpenseCategory::Salaries,
                description: "Planilla".to_string(),
                amount: 8000.0,
                date: last_month,
            },
        ];
        let mortalities = vec![
            Mortality {
                id: 1,
                coop_number: 2,
                quantity: 12,
                cause: MortalityCause::Natural,
                description: None,
                date: now() - Duration::days(4),
            },
            Mortality {
                id: 2,
                coop_number: 1,
                quantity: 5,
                cause: MortalityCause::Disease,
                description: None,
                date: last_month,
            },
        ];

        let summary = DashboardSummary::build(&coops, &invoices, &expenses, &mortalities, now());

        assert_eq!(summary.total_chickens, 830);
        assert_eq!(summary.active_coops, 2);
        assert_eq!(summary.sales_today, 1250.0);
        // pending and cancelled invoices are not sales yet
        assert_eq!(summary.sales_this_month, 1250.0);
        assert_eq!(summary.pending_invoices, 1);
        assert_eq!(summary.expenses_this_month, 1200.5);
        assert_eq!(summary.mortalities_this_month, 12);
        assert_eq!(summary.total_mortalities, 17);
        assert_eq!(summary.coops[0].age_category, AgeCategory::Old);
        assert_eq!(summary.coops[1].age_category, AgeCategory::Medium);
        assert_eq!(summary.coops[2].age_days, 2);
    }

    #[test]
    fn test_huge_counts_saturate() {
        let coops = vec![
            coop(1, i64::MAX, now(), CoopStatus::Active),
            coop(2, i64::MAX, now(), CoopStatus::Active),
        ];
        let summary = DashboardSummary::build(&coops, &[], &[], &[], now());
        assert_eq!(summary.total_chickens, i64::MAX);
    }

    #[test]
    fn test_serializes_camel_case() {
        let summary = DashboardSummary::build(&[], &[], &[], &[], now());
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["totalChickens"], 0);
        assert_eq!(json["salesThisMonth"], 0.0);
        assert!(json["coops"].as_array().unwrap().is_empty());
    }
}
