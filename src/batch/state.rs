//! Per-batch state for cascading mode.

use super::item::Item;

/// Items withheld so far and whether the batch has seen a change.
///
/// Created fresh for every batch and dropped with it.
#[derive(Debug, Default)]
pub struct BatchState {
    pending: Vec<Item>,
    changed: bool,
}

impl BatchState {
    /// Empty state: nothing pending, no change seen.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a change has been observed in this batch.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Number of items currently withheld.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Admit the next item in arrival order and return what to emit now.
    ///
    /// After the first change every item passes straight through. Before it,
    /// items are withheld; the first changed item releases all of them, itself
    /// included, in the order they arrived.
    pub fn admit(&mut self, item: Item, changed: bool) -> Vec<Item> {
        if self.changed {
            return vec![item];
        }
        self.pending.push(item);
        if changed {
            self.changed = true;
            return std::mem::take(&mut self.pending);
        }
        Vec::new()
    }

    /// End the batch, handing back any items that were never released.
    #[must_use]
    pub fn into_pending(self) -> Vec<Item> {
        self.pending
    }
}
