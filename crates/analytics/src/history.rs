use core_types::Bar;
use std::collections::VecDeque;

/// Default number of bars retained per symbol.
pub const DEFAULT_HISTORY_CAPACITY: usize = 3000;

/// A fixed-capacity ring of recent bars. Once full, each push evicts the oldest bar.
///
/// Logical index 0 is always the oldest bar currently held.
#[derive(Debug, Clone)]
pub struct BarHistory {
    bars: VecDeque<Bar>,
    capacity: usize,
}

impl BarHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            bars: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, bar: Bar) {
        if self.bars.len() == self.capacity {
            self.bars.pop_front();
        }
        self.bars.push_back(bar);
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    /// The most recent bar.
    pub fn last(&self) -> Option<&Bar> {
        self.bars.back()
    }

    /// The bar `back` positions before the most recent one (0 = latest).
    pub fn back(&self, back: usize) -> Option<&Bar> {
        self.bars
            .len()
            .checked_sub(back + 1)
            .and_then(|index| self.bars.get(index))
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Bar> + ExactSizeIterator {
        self.bars.iter()
    }
}

impl Default for BarHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
