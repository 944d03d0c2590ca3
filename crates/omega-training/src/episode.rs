use omega_stats::EpisodeIndex;

/// Per-slot episode bookkeeping.
///
/// Slot `i` starts with episode index `i`; the first unused index is `N`. Every
/// time a slot's episode completes, the slot takes the next unused index, so an
/// index never repeats and indices within a slot strictly increase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeIndexAllocator {
    current: Vec<EpisodeIndex>,
    next: EpisodeIndex,
}

impl EpisodeIndexAllocator {
    #[must_use]
    pub fn new(num_slots: usize) -> Self {
        let current = (0..num_slots as u64).map(EpisodeIndex::new).collect();
        Self {
            current,
            next: EpisodeIndex::new(num_slots as u64),
        }
    }

    #[must_use]
    pub fn num_slots(&self) -> usize {
        self.current.len()
    }

    /// Index of the episode currently running in `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range.
    #[must_use]
    pub fn current(&self, slot: usize) -> EpisodeIndex {
        self.current[slot]
    }

    #[must_use]
    pub fn current_indices(&self) -> &[EpisodeIndex] {
        &self.current
    }

    #[must_use]
    pub fn next_episode_index(&self) -> EpisodeIndex {
        self.next
    }

    /// Marks the episode in `slot` as complete and assigns the slot a new index.
    ///
    /// Returns the new index.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range.
    pub fn complete(&mut self, slot: usize) -> EpisodeIndex {
        let index = self.next;
        self.current[slot] = index;
        self.next = index.next();
        index
    }
}
