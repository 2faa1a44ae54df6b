//! Group reference updates into fixed-size batches for the backend.

use crate::protocol::RefUpdateCommand;

/// The amount of reference updates sent to the backend at once.
pub const HOOK_BATCH_SIZE: usize = 30;

/// Collects reference updates in arrival order and hands them out in batches of
/// [`HOOK_BATCH_SIZE`].
#[derive(Debug)]
pub struct RefUpdateBatcher {
    pending: Vec<RefUpdateCommand>,
    batch_size: usize,
    total: usize,
}

impl Default for RefUpdateBatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl RefUpdateBatcher {
    /// Create a batcher using [`HOOK_BATCH_SIZE`].
    pub fn new() -> Self {
        Self::with_batch_size(HOOK_BATCH_SIZE)
    }

    /// Create a batcher handing out batches of `batch_size`, which must not be zero.
    pub fn with_batch_size(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        RefUpdateBatcher {
            pending: Vec::with_capacity(batch_size),
            batch_size,
            total: 0,
        }
    }

    /// Queue `command`, returning a full batch once there are enough.
    pub fn push(&mut self, command: RefUpdateCommand) -> Option<Vec<RefUpdateCommand>> {
        self.pending.push(command);
        self.total += 1;
        (self.pending.len() >= self.batch_size)
            .then(|| std::mem::replace(&mut self.pending, Vec::with_capacity(self.batch_size)))
    }

    /// Return the remaining, possibly short, batch if anything is queued.
    pub fn finish(&mut self) -> Option<Vec<RefUpdateCommand>> {
        (!self.pending.is_empty()).then(|| std::mem::take(&mut self.pending))
    }

    /// The amount of queued commands not yet handed out.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// The amount of commands queued so far.
    pub fn total(&self) -> usize {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(idx: usize) -> RefUpdateCommand {
        RefUpdateCommand::new(
            "0000000000000000000000000000000000000000",
            format!("{idx:040x}"),
            format!("refs/heads/b{idx}"),
        )
    }

    #[test]
    fn batches_are_handed_out_in_order() {
        let mut batcher = RefUpdateBatcher::new();
        let mut sizes = Vec::new();
        let mut seen = Vec::new();
        for idx in 0..2 * HOOK_BATCH_SIZE + 5 {
            if let Some(batch) = batcher.push(command(idx)) {
                sizes.push(batch.len());
                seen.extend(batch);
            }
        }
        let rest = batcher.finish().unwrap();
        sizes.push(rest.len());
        seen.extend(rest);

        assert_eq!(sizes, [30, 30, 5]);
        assert_eq!(batcher.total(), 65);
        assert_eq!(batcher.pending(), 0);
        assert!(seen.iter().enumerate().all(|(idx, cmd)| *cmd == command(idx)));
    }

    #[test]
    fn nothing_to_finish() {
        let mut batcher = RefUpdateBatcher::with_batch_size(2);
        assert!(batcher.finish().is_none());
        assert!(batcher.push(command(0)).is_none());
        assert_eq!(batcher.push(command(1)).map(|b| b.len()), Some(2));
        assert!(batcher.finish().is_none());
    }
}
