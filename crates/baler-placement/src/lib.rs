//! Deterministic weighted straw placement.
//!
//! This crate implements the computational core of declustered,
//! hash-based data placement: given a set of weighted items and an
//! object, it decides which item should currently hold that object, such
//! that
//! - each item's long-run share of objects is proportional to its weight,
//! - the decision is a pure function of (object id, item state, round) —
//!   no lookup table or persisted mapping is required, and
//! - when weights or membership change, only the minimal necessary set of
//!   objects is relocated.
//!
//! # Usage
//!
//! ```
//! use baler_placement::{Bucket, Strategy};
//!
//! // Three items with weights 1, 1, 2: the last takes half the objects.
//! let mut bucket = Bucket::new(Strategy::Straw2, vec![1, 1, 2])?;
//! bucket.add_objects(1..=10_000)?;
//!
//! // Drain the first item; objects stay put until the next rebalance.
//! bucket.set_weight(0, 0)?;
//! let stats = bucket.rebalance()?;
//! assert_eq!(bucket.items()[0].assigned(), 0);
//! println!("moved {} objects (estimated {})", stats.moved, stats.expected_moves);
//! # Ok::<(), baler_placement::PlacementError>(())
//! ```
//!
//! # Concurrency
//!
//! All operations are synchronous and CPU-bound. Mutation takes
//! `&mut Bucket`, so the required single-writer discipline is enforced by
//! the borrow checker; [`Bucket::choose`] takes `&self` and is safe to
//! call concurrently for distinct objects.

#![warn(missing_docs)]

pub mod bucket;
pub mod error;
pub mod hash;
pub mod straw;

pub use bucket::{Bucket, Item, ItemId, ObjectId, RebalanceStats};
pub use error::{PlacementError, Result};
pub use straw::{Strategy, DEFAULT_MAX_ATTEMPTS};
