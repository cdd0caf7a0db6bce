use std::collections::VecDeque;

use visage_wire::AnimationSet;

/// A validated animation set waiting in the queue, with its assigned
/// turn-disambiguating identifier.
#[derive(Debug, Clone)]
pub struct QueuedSet {
    pub set: AnimationSet,
    pub set_id: u64,
}

/// Ordered, append-only queue of incoming animation sets.
///
/// Sets play strictly in arrival order; the scheduler dequeues at most one
/// at a time. The queue also owns the monotonic set-id counter used when a
/// caller does not force an id.
#[derive(Debug, Default)]
pub struct AnimationQueue {
    items: VecDeque<QueuedSet>,
    next_set_id: u64,
}

impl AnimationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a set to the tail and return its identifier (the caller's
    /// forced id when present, otherwise the next counter value).
    pub fn enqueue(&mut self, set: AnimationSet) -> u64 {
        let set_id = match set.forced_set_id {
            Some(id) => id,
            None => {
                let id = self.next_set_id;
                self.next_set_id += 1;
                id
            }
        };
        self.items.push_back(QueuedSet { set, set_id });
        set_id
    }

    /// Dequeue the head set, if any.
    pub fn pop(&mut self) -> Option<QueuedSet> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop all queued sets (agent switch).
    pub fn clear(&mut self) {
        self.items.clear();
    }
}
