//! Bucket: weighted items plus the current object assignment.
//!
//! A bucket owns an ordered arena of items and a direct object → item
//! index map. Placement is stateless per call (the selectors are pure
//! functions of object id, item state, and round); the bucket only records
//! outcomes so that a later [`Bucket::rebalance`] can relocate the minimal
//! set of objects after weights or membership change.
//!
//! Mutation requires `&mut self`, so the single-writer discipline the
//! placement contract demands is enforced by the borrow checker;
//! [`Bucket::choose`] takes `&self` and may run concurrently across
//! distinct objects.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{PlacementError, Result};
use crate::straw::{self, Strategy, DEFAULT_MAX_ATTEMPTS};

/// Identifier of an item within its bucket.
///
/// Ids are assigned densely in insertion order and double as arena
/// indices; items are never removed (a drained item keeps its slot with
/// weight zero), so the mapping is stable for the bucket's lifetime.
pub type ItemId = u32;

/// Identifier of a placed object. Supplied by the caller; the bucket
/// never invents object ids.
pub type ObjectId = u32;

/// A placement target: a weight, a disabled flag, and bookkeeping for the
/// objects currently held.
#[derive(Debug, Clone, Serialize)]
pub struct Item {
    id: ItemId,
    weight: u32,
    disabled: bool,
    /// Weight fraction against the bucket total, recomputed on demand.
    fraction: f64,
    /// Number of objects currently assigned here.
    assigned: u64,
}

impl Item {
    pub(crate) fn new(id: ItemId, weight: u32) -> Self {
        Self { id, weight, disabled: false, fraction: 0.0, assigned: 0 }
    }

    /// Item id (stable for the bucket's lifetime).
    #[must_use]
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Current weight.
    #[must_use]
    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Whether the item is excluded from fresh selections.
    #[must_use]
    pub fn disabled(&self) -> bool {
        self.disabled
    }

    /// Weight fraction as of the last update (construction or rebalance).
    #[must_use]
    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    /// Number of objects currently assigned to this item.
    ///
    /// May be nonzero even when the weight is zero or the item is
    /// disabled: existing assignments persist until the next rebalance.
    #[must_use]
    pub fn assigned(&self) -> u64 {
        self.assigned
    }

    /// True when fresh selections may land here.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.weight > 0 && !self.disabled
    }

    pub(crate) fn set_weight(&mut self, weight: u32) {
        self.weight = weight;
    }

    pub(crate) fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }
}

/// Counters returned by [`Bucket::rebalance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RebalanceStats {
    /// Half the summed absolute difference between each item's target
    /// share and its current holdings: a diagnostic lower bound on
    /// unavoidable movement, not an exact prediction.
    pub expected_moves: u64,
    /// Number of objects actually relocated.
    pub moved: u64,
}

/// An ordered collection of weighted items and the objects placed among
/// them.
#[derive(Debug, Clone)]
pub struct Bucket {
    strategy: Strategy,
    items: Vec<Item>,
    /// Object id → item index. Moving an object is an O(1) map update.
    assignments: HashMap<ObjectId, usize>,
}

impl Bucket {
    /// Create a bucket with one item per weight, in order.
    ///
    /// # Errors
    ///
    /// `InvalidWeight` if any weight is negative or exceeds `u32::MAX`.
    pub fn new(strategy: Strategy, weights: impl IntoIterator<Item = i64>) -> Result<Self> {
        let mut bucket =
            Self { strategy, items: Vec::new(), assignments: HashMap::new() };
        for weight in weights {
            bucket.add_item(weight)?;
        }
        bucket.update_fractions();
        Ok(bucket)
    }

    /// The selection strategy this bucket was built with.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// All items, in insertion order.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Total number of objects currently assigned.
    #[must_use]
    pub fn object_count(&self) -> u64 {
        self.assignments.len() as u64
    }

    /// The item currently holding `object`, if it has been placed.
    #[must_use]
    pub fn assignment(&self, object: ObjectId) -> Option<ItemId> {
        self.assignments.get(&object).map(|&idx| self.items[idx].id)
    }

    /// Append a new item and return its id.
    ///
    /// # Errors
    ///
    /// `InvalidWeight` if the weight is out of range.
    pub fn add_item(&mut self, weight: i64) -> Result<ItemId> {
        let weight = validate_weight(weight)?;
        let id = self.items.len() as ItemId;
        self.items.push(Item::new(id, weight));
        debug!(item = id, weight, "added item");
        Ok(id)
    }

    /// Set an item's weight.
    ///
    /// Does not move any objects; existing assignments persist until the
    /// next [`Bucket::rebalance`].
    ///
    /// # Errors
    ///
    /// `ItemNotFound` for an unknown id, `InvalidWeight` for an
    /// out-of-range weight.
    pub fn set_weight(&mut self, item: ItemId, weight: i64) -> Result<()> {
        let weight = validate_weight(weight)?;
        self.item_mut(item)?.set_weight(weight);
        debug!(item, weight, "weight changed");
        Ok(())
    }

    /// Set an item's disabled flag.
    ///
    /// A disabled item receives no fresh selections but keeps its weight
    /// and current holdings.
    ///
    /// # Errors
    ///
    /// `ItemNotFound` for an unknown id.
    pub fn set_disabled(&mut self, item: ItemId, disabled: bool) -> Result<()> {
        self.item_mut(item)?.set_disabled(disabled);
        debug!(item, disabled, "disabled flag changed");
        Ok(())
    }

    /// Compute the item that should hold `object` under the current item
    /// state, without recording anything. Pure per the placement
    /// contract: same inputs, same answer.
    ///
    /// # Errors
    ///
    /// `NoEligibleItem` when every item is disabled or zero-weight.
    pub fn choose(&self, object: ObjectId) -> Result<ItemId> {
        self.choose_index(object).map(|idx| self.items[idx].id)
    }

    /// Reject-and-retry selection, additionally reporting how many
    /// attempts were needed. Provided for retry-pressure telemetry; the
    /// steady-state distribution matches [`Bucket::choose`].
    ///
    /// # Errors
    ///
    /// `NoEligibleItem` when nothing is selectable, `RetryExhausted` if
    /// the attempt cap is hit.
    pub fn choose_with_attempts(&self, object: ObjectId) -> Result<(ItemId, u32)> {
        straw::select_with_attempts(self.strategy, &self.items, object, DEFAULT_MAX_ATTEMPTS)
            .map(|(idx, attempts)| (self.items[idx].id, attempts))
    }

    /// Place a new object and record the assignment.
    ///
    /// # Errors
    ///
    /// `DuplicateObject` if the id is already assigned, `NoEligibleItem`
    /// when nothing is selectable.
    pub fn add_object(&mut self, object: ObjectId) -> Result<ItemId> {
        if self.assignments.contains_key(&object) {
            return Err(PlacementError::DuplicateObject(object));
        }
        let idx = self.choose_index(object)?;
        self.assignments.insert(object, idx);
        self.items[idx].assigned += 1;
        Ok(self.items[idx].id)
    }

    /// Place a new object using the reject-and-retry selector, recording
    /// the assignment and reporting the attempts taken.
    ///
    /// # Errors
    ///
    /// `DuplicateObject` if the id is already assigned, plus the
    /// [`Bucket::choose_with_attempts`] failure modes.
    pub fn add_object_with_attempts(&mut self, object: ObjectId) -> Result<(ItemId, u32)> {
        if self.assignments.contains_key(&object) {
            return Err(PlacementError::DuplicateObject(object));
        }
        let (idx, attempts) =
            straw::select_with_attempts(self.strategy, &self.items, object, DEFAULT_MAX_ATTEMPTS)?;
        self.assignments.insert(object, idx);
        self.items[idx].assigned += 1;
        Ok((self.items[idx].id, attempts))
    }

    /// Place a sequence of fresh objects; returns how many were added.
    ///
    /// # Errors
    ///
    /// Fails on the first id that cannot be placed; earlier placements
    /// stick.
    pub fn add_objects(&mut self, objects: impl IntoIterator<Item = ObjectId>) -> Result<u64> {
        let mut added = 0;
        for object in objects {
            self.add_object(object)?;
            added += 1;
        }
        Ok(added)
    }

    /// Recompute placement for every assigned object against the current
    /// item state and relocate only the objects whose outcome changed.
    ///
    /// Runs in two phases: the assignment map is snapshotted first, then
    /// every destination is computed against the new weights/flags and
    /// applied, so iteration never observes its own moves.
    ///
    /// # Errors
    ///
    /// `NoEligibleItem` when objects are assigned but nothing is
    /// selectable; no objects are moved in that case.
    pub fn rebalance(&mut self) -> Result<RebalanceStats> {
        self.update_fractions();

        let object_count = self.object_count();
        let expected: f64 = self
            .items
            .iter()
            .map(|item| (item.fraction * object_count as f64 - item.assigned as f64).abs())
            .sum();
        let expected_moves = expected as u64 / 2;

        if object_count > 0 && !self.items.iter().any(Item::is_eligible) {
            return Err(PlacementError::NoEligibleItem);
        }

        let snapshot: Vec<(ObjectId, usize)> =
            self.assignments.iter().map(|(&object, &idx)| (object, idx)).collect();

        let mut moved = 0u64;
        for (object, old_idx) in snapshot {
            // Eligibility was checked above, so selection cannot fail here.
            let Some(new_idx) = straw::select(self.strategy, &self.items, object, 0) else {
                return Err(PlacementError::NoEligibleItem);
            };
            if new_idx != old_idx {
                self.assignments.insert(object, new_idx);
                self.items[old_idx].assigned -= 1;
                self.items[new_idx].assigned += 1;
                moved += 1;
            }
        }

        info!(expected_moves, moved, objects = object_count, "rebalance complete");
        Ok(RebalanceStats { expected_moves, moved })
    }

    fn choose_index(&self, object: ObjectId) -> Result<usize> {
        straw::select(self.strategy, &self.items, object, 0).ok_or(PlacementError::NoEligibleItem)
    }

    fn item_mut(&mut self, item: ItemId) -> Result<&mut Item> {
        self.items.get_mut(item as usize).ok_or(PlacementError::ItemNotFound(item))
    }

    /// Recompute each item's weight fraction against the current total.
    fn update_fractions(&mut self) {
        let total: u64 = self.items.iter().map(|item| u64::from(item.weight)).sum();
        for item in &mut self.items {
            item.fraction =
                if total == 0 { 0.0 } else { f64::from(item.weight) / total as f64 };
        }
    }
}

fn validate_weight(weight: i64) -> Result<u32> {
    u32::try_from(weight).map_err(|_| PlacementError::InvalidWeight(weight))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_weight() {
        let err = Bucket::new(Strategy::Straw2, vec![1, -1, 2]).unwrap_err();
        assert_eq!(err, PlacementError::InvalidWeight(-1));

        let mut bucket = Bucket::new(Strategy::Straw2, vec![1, 2]).unwrap();
        assert_eq!(bucket.set_weight(0, -5).unwrap_err(), PlacementError::InvalidWeight(-5));
        assert_eq!(
            bucket.set_weight(0, i64::from(u32::MAX) + 1).unwrap_err(),
            PlacementError::InvalidWeight(i64::from(u32::MAX) + 1)
        );
    }

    #[test]
    fn unknown_item_rejected() {
        let mut bucket = Bucket::new(Strategy::Straw2, vec![1]).unwrap();
        assert_eq!(bucket.set_weight(9, 1).unwrap_err(), PlacementError::ItemNotFound(9));
        assert_eq!(bucket.set_disabled(9, true).unwrap_err(), PlacementError::ItemNotFound(9));
    }

    #[test]
    fn fractions_follow_weights() {
        let bucket = Bucket::new(Strategy::Straw2, vec![1, 1, 2]).unwrap();
        let fractions: Vec<f64> = bucket.items().iter().map(Item::fraction).collect();
        assert_eq!(fractions, vec![0.25, 0.25, 0.5]);
    }

    #[test]
    fn add_object_records_assignment() {
        let mut bucket = Bucket::new(Strategy::Straw2, vec![1, 1]).unwrap();
        let item = bucket.add_object(7).unwrap();
        assert_eq!(bucket.object_count(), 1);
        assert_eq!(bucket.assignment(7), Some(item));
        assert_eq!(bucket.items()[item as usize].assigned(), 1);
    }

    #[test]
    fn duplicate_object_rejected() {
        let mut bucket = Bucket::new(Strategy::Straw2, vec![1]).unwrap();
        bucket.add_object(7).unwrap();
        assert_eq!(bucket.add_object(7).unwrap_err(), PlacementError::DuplicateObject(7));
        assert_eq!(bucket.object_count(), 1);
    }

    #[test]
    fn assigned_counts_match_object_count() {
        let mut bucket = Bucket::new(Strategy::Straw2, vec![3, 1, 2]).unwrap();
        bucket.add_objects(1..=1000).unwrap();
        let total: u64 = bucket.items().iter().map(Item::assigned).sum();
        assert_eq!(total, bucket.object_count());
        assert_eq!(total, 1000);
    }

    #[test]
    fn single_item_wins_trivially() {
        let mut bucket = Bucket::new(Strategy::Straw2, vec![5]).unwrap();
        bucket.add_objects(1..=100).unwrap();
        assert_eq!(bucket.items()[0].assigned(), 100);
        let stats = bucket.rebalance().unwrap();
        assert_eq!(stats.moved, 0);
    }

    #[test]
    fn choose_fails_when_all_disabled() {
        let mut bucket = Bucket::new(Strategy::Straw2, vec![1, 2]).unwrap();
        bucket.set_disabled(0, true).unwrap();
        bucket.set_disabled(1, true).unwrap();
        assert_eq!(bucket.choose(1).unwrap_err(), PlacementError::NoEligibleItem);
        assert_eq!(bucket.add_object(1).unwrap_err(), PlacementError::NoEligibleItem);
        assert_eq!(bucket.choose_with_attempts(1).unwrap_err(), PlacementError::NoEligibleItem);
    }

    #[test]
    fn choose_fails_when_all_zero_weight() {
        let bucket = Bucket::new(Strategy::Straw2Plus, vec![0, 0]).unwrap();
        assert_eq!(bucket.choose(1).unwrap_err(), PlacementError::NoEligibleItem);
    }

    #[test]
    fn lazy_eviction() {
        let mut bucket = Bucket::new(Strategy::Straw2, vec![1, 1]).unwrap();
        bucket.add_objects(1..=500).unwrap();
        let before: Vec<u64> = bucket.items().iter().map(Item::assigned).collect();

        // Neither zeroing a weight nor disabling moves anything by itself.
        bucket.set_weight(0, 0).unwrap();
        bucket.set_disabled(1, true).unwrap();
        let after: Vec<u64> = bucket.items().iter().map(Item::assigned).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn rebalance_empty_bucket_is_noop() {
        let mut bucket = Bucket::new(Strategy::Straw2, vec![0, 0]).unwrap();
        let stats = bucket.rebalance().unwrap();
        assert_eq!(stats, RebalanceStats { expected_moves: 0, moved: 0 });
    }

    #[test]
    fn rebalance_fails_without_eligible_items() {
        let mut bucket = Bucket::new(Strategy::Straw2, vec![1, 1]).unwrap();
        bucket.add_objects(1..=100).unwrap();
        bucket.set_weight(0, 0).unwrap();
        bucket.set_disabled(1, true).unwrap();
        assert_eq!(bucket.rebalance().unwrap_err(), PlacementError::NoEligibleItem);
        // Nothing moved.
        let total: u64 = bucket.items().iter().map(Item::assigned).sum();
        assert_eq!(total, 100);
    }
}
