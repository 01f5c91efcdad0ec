//! The placement/rebalance simulation scenario.
//!
//! Drives the placement core through the sequence that matters in the
//! field: fill, drain an item, run with an item disabled under continued
//! load, replace it, remove it, and grow the bucket — printing the
//! distribution after every step.

use anyhow::{bail, Result};
use baler_placement::{Bucket, ItemId, ObjectId, Strategy};
use tracing::info;

use crate::cli::{SimulateArgs, StrategyArg};
use crate::report::{AttemptHistogram, DistributionReport};

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Straw2 => Strategy::Straw2,
            StrategyArg::Straw2Plus => Strategy::Straw2Plus,
        }
    }
}

/// Object id supply for the driver. The core never invents ids; the
/// driver hands out a dense sequence.
struct IdSource {
    next: ObjectId,
}

impl IdSource {
    fn new() -> Self {
        Self { next: 1 }
    }

    fn take(&mut self, count: u32) -> std::ops::RangeInclusive<ObjectId> {
        let start = self.next;
        self.next += count;
        start..=self.next - 1
    }
}

/// Run the full simulation scenario.
pub fn run(args: &SimulateArgs) -> Result<()> {
    let weights: Vec<i64> = match &args.weights {
        Some(weights) => weights.clone(),
        None => (1..=i64::from(args.items)).collect(),
    };
    if weights.is_empty() {
        bail!("at least one item weight is required");
    }

    info!(strategy = ?args.strategy, items = weights.len(), objects = args.objects, "starting simulation");

    let mut bucket = Bucket::new(args.strategy.into(), weights)?;
    let mut ids = IdSource::new();

    fill(&mut bucket, &mut ids, args)?;
    DistributionReport::snapshot("initial fill", &bucket, None).print(args.format)?;

    // Drain the first weighted item.
    let drained = first_weighted(&bucket)?;
    bucket.set_weight(drained, 0)?;
    let stats = bucket.rebalance()?;
    DistributionReport::snapshot("drained one item", &bucket, Some(stats)).print(args.format)?;

    // Disable an item (overloaded or failed) and keep adding objects
    // before rebalancing: its holdings must not grow.
    let overloaded = first_weighted(&bucket)?;
    bucket.set_disabled(overloaded, true)?;
    fill(&mut bucket, &mut ids, args)?;
    DistributionReport::snapshot("overloaded: disabled + more objects", &bucket, None)
        .print(args.format)?;

    bucket.set_weight(overloaded, 0)?;
    let stats = bucket.rebalance()?;
    DistributionReport::snapshot("overloaded item drained", &bucket, Some(stats))
        .print(args.format)?;

    // Replace the item: re-enable with a fresh unit weight.
    bucket.set_disabled(overloaded, false)?;
    bucket.set_weight(overloaded, 1)?;
    let stats = bucket.rebalance()?;
    DistributionReport::snapshot("item replaced", &bucket, Some(stats)).print(args.format)?;

    // Remove it again.
    bucket.set_weight(overloaded, 0)?;
    let stats = bucket.rebalance()?;
    DistributionReport::snapshot("item removed", &bucket, Some(stats)).print(args.format)?;

    // Grow the bucket one item at a time.
    for step in 1..=args.grow {
        bucket.add_item(1)?;
        let stats = bucket.rebalance()?;
        DistributionReport::snapshot(&format!("grow step {step}"), &bucket, Some(stats))
            .print(args.format)?;
    }

    Ok(())
}

/// Add one batch of objects, via the retry selector when requested.
fn fill(bucket: &mut Bucket, ids: &mut IdSource, args: &SimulateArgs) -> Result<()> {
    let batch = ids.take(args.objects);
    if args.retry {
        let mut histogram = AttemptHistogram::default();
        for object in batch {
            let (_, attempts) = bucket.add_object_with_attempts(object)?;
            histogram.record(attempts);
        }
        histogram.print(args.format)?;
    } else {
        bucket.add_objects(batch)?;
    }
    Ok(())
}

/// First item that still carries weight.
fn first_weighted(bucket: &Bucket) -> Result<ItemId> {
    bucket
        .items()
        .iter()
        .find(|item| item.weight() > 0)
        .map(baler_placement::Item::id)
        .ok_or_else(|| anyhow::anyhow!("no weighted items left"))
}
