// 🔄 Coop Rotation - batches age forward one slot per chicken purchase
//
// Slot i takes over what slot i+1 held, the last slot receives the new
// chicks, and slot 1's batch leaves the pipeline. Every update is computed
// from one snapshot taken before anything is written, so applying them in
// order never reads a value that was already shifted.

use crate::entities::Coop;
use chrono::{DateTime, Utc};

/// One write the store must perform
#[derive(Debug, Clone, PartialEq)]
pub struct SlotUpdate {
    pub coop_id: i64,
    pub number: i64,
    pub quantity: i64,
    pub entry_date: DateTime<Utc>,
    /// Quantity the slot held in the snapshot
    pub previous_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RotationPlan {
    /// Ordered 1 → last; apply sequentially
    pub updates: Vec<SlotUpdate>,
    /// Birds slot 1 held before rotation (they leave inventory)
    pub discarded: i64,
    /// Slot numbers expected but absent from the snapshot
    pub missing_slots: Vec<i64>,
}

impl RotationPlan {
    pub fn is_complete(&self) -> bool {
        self.missing_slots.is_empty()
    }
}

/// Plan the shift for `incoming` new chicks arriving at `arrived`.
///
/// A missing slot turns every update that touches it into a no-op; it is
/// reported in `missing_slots`, never as an error.
pub fn plan_rotation(
    snapshot: &[Coop],
    slot_count: u32,
    incoming: i64,
    arrived: DateTime<Utc>,
) -> RotationPlan {
    let last = i64::from(slot_count);
    let find = |number: i64| snapshot.iter().find(|c| c.number == number);

    let mut plan = RotationPlan {
        discarded: find(1).map(|c| c.quantity).unwrap_or(0),
        missing_slots: (1..=last).filter(|n| find(*n).is_none()).collect(),
        ..RotationPlan::default()
    };

    for number in 1..last {
        if let (Some(current), Some(next)) = (find(number), find(number + 1)) {
            plan.updates.push(SlotUpdate {
                coop_id: current.id,
                number,
                quantity: next.quantity,
                entry_date: next.entry_date,
                previous_quantity: current.quantity,
            });
        }
    }

    if let Some(newest) = find(last) {
        plan.updates.push(SlotUpdate {
            coop_id: newest.id,
            number: last,
            quantity: incoming,
            entry_date: arrived,
            previous_quantity: newest.quantity,
        });
    }

    plan
}

/// Apply a plan to an in-memory copy of the coops
pub fn apply_plan(coops: &mut [Coop], plan: &RotationPlan) {
    for update in &plan.updates {
        if let Some(coop) = coops.iter_mut().find(|c| c.id == update.coop_id) {
            coop.quantity = update.quantity;
            coop.entry_date = update.entry_date;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::CoopStatus;
    use chrono::TimeZone;

    fn sample_coops() -> Vec<Coop> {
        let data = [
            (450, (2024, 11, 15)),
            (380, (2024, 11, 10)),
            (420, (2024, 11, 5)),
            (360, (2024, 10, 28)),
            (480, (2024, 10, 20)),
            (390, (2024, 10, 15)),
            (370, (2024, 11, 25)),
        ];

        data.iter()
            .enumerate()
            .map(|(i, (quantity, (y, m, d)))| Coop {
                id: i as i64 + 1,
                number: i as i64 + 1,
                quantity: *quantity,
                entry_date: Utc.with_ymd_and_hms(*y, *m, *d, 0, 0, 0).unwrap(),
                status: CoopStatus::Active,
            })
            .collect()
    }

    fn quantities(coops: &[Coop]) -> Vec<i64> {
        let mut sorted = coops.to_vec();
        sorted.sort_by_key(|c| c.number);
        sorted.iter().map(|c| c.quantity).collect()
    }

    #[test]
    fn test_rotation_shifts_every_batch() {
        let mut coops = sample_coops();
        let now = Utc.with_ymd_and_hms(2024, 12, 1, 9, 0, 0).unwrap();

        let plan = plan_rotation(&coops, 7, 500, now);
        apply_plan(&mut coops, &plan);

        assert_eq!(quantities(&coops), vec![380, 420, 360, 480, 390, 370, 500]);
        assert_eq!(plan.discarded, 450);
        assert!(plan.is_complete());
        assert_eq!(plan.updates.len(), 7);
    }

    #[test]
    fn test_entry_dates_travel_with_batches() {
        let original = sample_coops();
        let mut coops = original.clone();
        let now = Utc.with_ymd_and_hms(2024, 12, 1, 9, 0, 0).unwrap();

        apply_plan(&mut coops, &plan_rotation(&original, 7, 500, now));

        for i in 0..6 {
            assert_eq!(coops[i].entry_date, original[i + 1].entry_date);
        }
        assert_eq!(coops[6].entry_date, now);
    }

    #[test]
    fn test_sum_of_shifted_slots_is_preserved() {
        let before = sample_coops();
        let mut after = before.clone();
        apply_plan(&mut after, &plan_rotation(&before, 7, 123, Utc::now()));

        // slots 2..7 before are exactly slots 1..6 after
        let shifted_before: i64 = before[1..7].iter().map(|c| c.quantity).sum();
        let shifted_after: i64 = after[0..6].iter().map(|c| c.quantity).sum();
        assert_eq!(shifted_before, shifted_after);
        assert!(!after.iter().any(|c| c.quantity == 450));
        assert_eq!(after[6].quantity, 123);
    }

    #[test]
    fn test_snapshot_order_does_not_matter() {
        let mut shuffled = sample_coops();
        shuffled.reverse();
        let now = Utc::now();

        let mut coops = shuffled.clone();
        apply_plan(&mut coops, &plan_rotation(&shuffled, 7, 500, now));

        assert_eq!(quantities(&coops), vec![380, 420, 360, 480, 390, 370, 500]);
    }

    #[test]
    fn test_missing_last_slot_is_a_no_op_for_its_neighbour() {
        let mut coops: Vec<Coop> = sample_coops().into_iter().filter(|c| c.number != 7).collect();
        let snapshot = coops.clone();

        let plan = plan_rotation(&snapshot, 7, 500, Utc::now());
        apply_plan(&mut coops, &plan);

        // slots 1..5 shift, slot 6 keeps its batch, nothing receives the new chicks
        assert_eq!(quantities(&coops), vec![380, 420, 360, 480, 390, 390]);
        assert_eq!(plan.missing_slots, vec![7]);
        assert!(!plan.is_complete());
        assert!(plan.updates.iter().all(|u| u.number <= 5));
    }

    #[test]
    fn test_custom_slot_count() {
        let coops: Vec<Coop> = sample_coops().into_iter().take(3).collect();
        let mut rotated = coops.clone();
        apply_plan(&mut rotated, &plan_rotation(&coops, 3, 50, Utc::now()));

        assert_eq!(quantities(&rotated), vec![380, 420, 50]);
    }

    #[test]
    fn test_single_slot_pipeline_just_replaces() {
        let coops: Vec<Coop> = sample_coops().into_iter().take(1).collect();
        let plan = plan_rotation(&coops, 1, 75, Utc::now());

        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].quantity, 75);
        assert_eq!(plan.discarded, 450);
    }
}
