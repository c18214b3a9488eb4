//! Range math and transfer planning.
//!
//! Splits a resource of known size into contiguous byte ranges, one per
//! worker, and computes the HTTP Range header bounds for each.

mod plan;
mod range;

pub use plan::{plan, PlanError, TransferPlan};
pub use range::ByteRange;
