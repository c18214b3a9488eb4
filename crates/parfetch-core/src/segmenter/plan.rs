//! Partition a resource into one range per worker.

use super::range::ByteRange;

/// Planning failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("worker count must be at least 1")]
    ZeroWorkers,
    /// The range list for this worker count does not fit in memory.
    #[error("cannot allocate a plan of {ranges} ranges")]
    TooManyRanges { ranges: u32 },
    /// A plan whose ranges do not partition `[0, total_size)`.
    #[error("ranges do not partition [0, {total_size}): {reason}")]
    NotAPartition { total_size: u64, reason: String },
}

/// Ordered, contiguous, non-overlapping ranges covering `[0, total_size)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    pub total_size: u64,
    pub ranges: Vec<ByteRange>,
}

impl TransferPlan {
    /// Check the partition invariant. Concurrent offset writes are only safe
    /// because ranges are disjoint, so the orchestrator calls this before dispatch.
    pub fn validate(&self) -> Result<(), PlanError> {
        let mut expected_offset = 0u64;
        for (i, r) in self.ranges.iter().enumerate() {
            if r.length == 0 {
                return Err(self.not_a_partition(format!("range {} is empty", i)));
            }
            if r.offset != expected_offset {
                return Err(self.not_a_partition(format!(
                    "range {} starts at {}, expected {}",
                    i, r.offset, expected_offset
                )));
            }
            expected_offset = r
                .offset
                .checked_add(r.length)
                .ok_or_else(|| self.not_a_partition(format!("range {} overflows", i)))?;
        }
        if expected_offset != self.total_size {
            return Err(self.not_a_partition(format!("ranges end at {}", expected_offset)));
        }
        Ok(())
    }

    fn not_a_partition(&self, reason: String) -> PlanError {
        PlanError::NotAPartition {
            total_size: self.total_size,
            reason,
        }
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Builds a plan for `total_size` bytes split across `worker_count` workers.
///
/// Every range gets `total_size / worker_count` bytes and the last one also
/// absorbs the remainder. Ranges that would be empty (`total_size < worker_count`)
/// are left out, so no zero-byte Range request is ever issued; a zero-size
/// resource yields an empty plan.
pub fn plan(total_size: u64, worker_count: u32) -> Result<TransferPlan, PlanError> {
    if worker_count == 0 {
        return Err(PlanError::ZeroWorkers);
    }

    let workers = u64::from(worker_count);
    let base = total_size / workers;

    // Every range but the last would be empty: only the last one carries bytes.
    if base == 0 {
        let ranges = if total_size == 0 {
            Vec::new()
        } else {
            vec![ByteRange::new(0, total_size)]
        };
        return Ok(TransferPlan { total_size, ranges });
    }

    let last_len = base + total_size % workers;
    let mut ranges = Vec::new();
    ranges
        .try_reserve_exact(worker_count as usize)
        .map_err(|_| PlanError::TooManyRanges { ranges: worker_count })?;
    for i in 0..workers - 1 {
        ranges.push(ByteRange::new(i * base, base));
    }
    ranges.push(ByteRange::new((workers - 1) * base, last_len));

    Ok(TransferPlan { total_size, ranges })
}
