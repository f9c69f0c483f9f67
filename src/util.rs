//! Work partitioning and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{GraphError, Result};

/// Default number of nodes per import batch.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Number of batches needed to cover `elements` at `batch_size` each.
pub fn thread_size(batch_size: usize, elements: usize) -> Result<usize> {
    if batch_size == 0 {
        return Err(GraphError::InvalidArgument(format!(
            "batch size must be positive, got {batch_size}"
        )));
    }
    Ok(elements.div_ceil(batch_size))
}

/// Shrinks `batch_size` so that roughly `concurrency` batches cover the
/// node space, never below one node per batch.
pub fn adjust_batch_size(node_count: usize, concurrency: usize, batch_size: usize) -> usize {
    if concurrency == 0 {
        return batch_size.max(1);
    }
    let target = node_count.div_ceil(concurrency);
    batch_size.min(target).max(1)
}

/// Cooperative cancellation token.
///
/// Cloned into workers and polled between work units: between node
/// iterations during construction and between levels of a BFS batch.
/// Cancellation is not an abort; work in flight finishes its current unit
/// and whatever has been produced so far remains well formed.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Visible to every clone of this flag.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_size_rounds_up() {
        assert_eq!(thread_size(100, 0).unwrap(), 0);
        assert_eq!(thread_size(100, 1).unwrap(), 1);
        assert_eq!(thread_size(100, 100).unwrap(), 1);
        assert_eq!(thread_size(100, 101).unwrap(), 2);
        assert!(thread_size(0, 10).is_err());
    }

    #[test]
    fn batch_size_targets_concurrency() {
        assert_eq!(adjust_batch_size(1000, 4, 10_000), 250);
        assert_eq!(adjust_batch_size(100_000, 4, 10_000), 10_000);
        assert_eq!(adjust_batch_size(3, 8, 10_000), 1);
        assert_eq!(adjust_batch_size(0, 4, 10_000), 1);
    }

    #[test]
    fn cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());
        flag.cancel();
        assert!(clone.is_cancelled());
    }
}
