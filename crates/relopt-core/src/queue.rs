//! # Rule Queue
//!
//! Pending `(rule, root node)` work items. The matcher runs when an item is popped, not
//! when it is pushed, so an item always sees the memo as it is at firing time.
//!
//! An item that is already pending is not queued a second time. Once popped it may be
//! queued again, for instance after a merge gave one of its inputs a new member.
//! Whether a particular binding has already fired is tracked by the search, keyed by
//! node digests.
//!
//! ## Disciplines
//!
//! - `Exhaustive`: plain FIFO.
//! - `CostGuided`: a min-heap on [`Priority`], ties broken by push order. Priorities only
//!   ever get worse while an item waits (a class gains a realization, a class sees more
//!   firings), so the heap is corrected lazily: a popped item whose current priority is
//!   worse than the one it was pushed with goes back in with the fresh value.

use crate::config::FiringDiscipline;
use crate::memo::NodeId;
use crate::rule::RuleId;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkItem {
    pub rule: RuleId,
    pub root: NodeId,
}

/// Cost-guided ordering key. Smaller fires first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority {
    /// The root's class already has a costed realization.
    pub realized: bool,
    pub transformation: bool,
    /// Rule firings already spent on the root's class.
    pub firings: u32,
}

#[derive(Debug)]
pub struct RuleQueue {
    discipline: FiringDiscipline,
    fifo: VecDeque<WorkItem>,
    heap: BinaryHeap<Reverse<(Priority, u64, WorkItem)>>,
    pending: HashSet<WorkItem>,
    next_seq: u64,
}

impl RuleQueue {
    pub fn new(discipline: FiringDiscipline) -> Self {
        Self {
            discipline,
            fifo: VecDeque::new(),
            heap: BinaryHeap::new(),
            pending: HashSet::new(),
            next_seq: 0,
        }
    }

    pub fn discipline(&self) -> FiringDiscipline {
        self.discipline
    }

    /// Queue an item unless it is already pending. Returns whether it was queued.
    pub fn push(&mut self, item: WorkItem, priority: Priority) -> bool {
        if !self.pending.insert(item) {
            return false;
        }
        match self.discipline {
            FiringDiscipline::Exhaustive => self.fifo.push_back(item),
            FiringDiscipline::CostGuided => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.heap.push(Reverse((priority, seq, item)));
            }
        }
        true
    }

    /// Next item to fire. `current` recomputes an item's priority; it is only consulted
    /// by the cost-guided discipline.
    pub fn pop(&mut self, current: impl Fn(&WorkItem) -> Priority) -> Option<WorkItem> {
        let item = match self.discipline {
            FiringDiscipline::Exhaustive => self.fifo.pop_front()?,
            FiringDiscipline::CostGuided => loop {
                let Reverse((stored, seq, item)) = self.heap.pop()?;
                let fresh = current(&item);
                if fresh > stored {
                    self.heap.push(Reverse((fresh, seq, item)));
                    continue;
                }
                break item;
            },
        };
        self.pending.remove(&item);
        Some(item)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn contains(&self, item: &WorkItem) -> bool {
        self.pending.contains(item)
    }
}
