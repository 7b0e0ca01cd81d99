// 📦 Stock Adjustment Rules
// Mortalities and invoices take birds out of a coop, but only when the coop
// holds at least the requested amount. A short coop is left untouched and the
// caller is told why; it is never an error.

use crate::entities::Coop;

#[derive(Debug, Clone, PartialEq)]
pub enum Deduction {
    /// Write `after` to the coop
    Apply {
        coop_id: i64,
        coop_number: i64,
        before: i64,
        after: i64,
    },
    /// Coop holds fewer birds than requested
    Insufficient {
        coop_number: i64,
        available: i64,
        requested: i64,
    },
    /// No coop with that number exists
    CoopMissing { coop_number: i64 },
}

impl Deduction {
    pub fn is_applied(&self) -> bool {
        matches!(self, Deduction::Apply { .. })
    }

    /// Short reason for skipped adjustments, for logs and audit events
    pub fn skip_reason(&self) -> Option<&'static str> {
        match self {
            Deduction::Apply { .. } => None,
            Deduction::Insufficient { .. } => Some("insufficient_stock"),
            Deduction::CoopMissing { .. } => Some("coop_missing"),
        }
    }
}

/// Decide the effect of removing `requested` birds from coop `coop_number`
pub fn plan_deduction(coops: &[Coop], coop_number: i64, requested: i64) -> Deduction {
    match coops.iter().find(|c| c.number == coop_number) {
        None => Deduction::CoopMissing { coop_number },
        Some(coop) if coop.quantity >= requested => Deduction::Apply {
            coop_id: coop.id,
            coop_number,
            before: coop.quantity,
            after: coop.quantity - requested,
        },
        Some(coop) => Deduction::Insufficient {
            coop_number,
            available: coop.quantity,
            requested,
        },
    }
}
