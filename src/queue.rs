//! Intrusive record queue
//!
//! Singly linked, non-circular FIFO. Nodes live in an arena owned by the
//! queue and are recycled through a free list, so steady-state pushes do not
//! allocate. Every occupied node holds exactly one retained `RecordRef`:
//! `push` retains, `pop` hands that reference to the caller, `clear` releases.
//!
//! Not synchronized: the owner serializes all access.

use crate::record::RecordRef;

struct Node {
    record: Option<RecordRef>,
    next: Option<usize>,
}

/// FIFO of retained records
#[derive(Default)]
pub struct Queue {
    nodes: Vec<Node>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    size: usize,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Nodes allocated so far (occupied + free)
    pub fn node_capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Retain `record` and append it
    pub fn push(&mut self, record: &RecordRef) {
        let node = Node {
            record: Some(record.retain()),
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };

        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        self.size += 1;
    }

    /// Remove the oldest record; the caller now owns its reference
    pub fn pop(&mut self) -> Option<RecordRef> {
        let idx = self.head?;
        let node = &mut self.nodes[idx];
        let record = node.record.take();
        self.head = node.next.take();
        self.free.push(idx);
        self.size -= 1;
        if self.size == 0 {
            self.head = None;
            self.tail = None;
        }
        record
    }

    /// Release every queued record and return all nodes to the free list
    pub fn clear(&mut self) {
        while let Some(record) = self.pop() {
            record.release();
        }
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            queue: self,
            node: self.head,
        }
    }
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("len", &self.size)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

/// Borrowing iterator, oldest first
pub struct Iter<'a> {
    queue: &'a Queue,
    node: Option<usize>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a RecordRef;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.node?;
        let node = &self.queue.nodes[idx];
        self.node = node.next;
        node.record.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordPool;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn make(pool: &Arc<RecordPool>, text: &str) -> RecordRef {
        let mut b = pool.acquire();
        b.set_text(text);
        b.freeze()
    }

    #[test]
    fn test_push_retains() {
        let pool = RecordPool::new(8);
        let record = make(&pool, "a");
        let mut q = Queue::new();
        q.push(&record);
        assert_eq!(record.ref_count(), 2);
        assert_eq!(q.len(), 1);
        drop(record);
        assert_eq!(pool.stats().recycled, 0);
        q.clear();
        assert_eq!(pool.stats().recycled, 1);
    }

    #[test]
    fn test_pop_fifo() {
        let pool = RecordPool::new(8);
        let mut q = Queue::new();
        for t in ["1", "2", "3"] {
            q.push(&make(&pool, t));
        }
        assert_eq!(q.pop().unwrap().text(), "1");
        assert_eq!(q.pop().unwrap().text(), "2");
        assert_eq!(q.pop().unwrap().text(), "3");
        assert!(q.pop().is_none());
        assert!(q.is_empty());
    }

    #[test]
    fn test_pop_transfers_ownership() {
        let pool = RecordPool::new(8);
        let record = make(&pool, "x");
        let mut q = Queue::new();
        q.push(&record);
        let popped = q.pop().unwrap();
        assert_eq!(record.ref_count(), 2);
        drop(popped);
        assert_eq!(record.ref_count(), 1);
    }

    #[test]
    fn test_clear_releases_all() {
        let pool = RecordPool::new(8);
        let mut q = Queue::new();
        for t in ["a", "b", "c"] {
            q.push(&make(&pool, t));
        }
        q.clear();
        assert!(q.is_empty());
        assert_eq!(pool.stats().in_flight(), 0);
    }

    #[test]
    fn test_nodes_are_reused() {
        let pool = RecordPool::new(8);
        let mut q = Queue::new();
        for _ in 0..10 {
            q.push(&make(&pool, "r"));
            q.push(&make(&pool, "r"));
            q.clear();
        }
        assert_eq!(q.node_capacity(), 2);
    }

    #[test]
    fn test_iter_does_not_consume() {
        let pool = RecordPool::new(8);
        let mut q = Queue::new();
        q.push(&make(&pool, "a"));
        q.push(&make(&pool, "b"));
        let texts: Vec<&str> = q.iter().map(|r| r.text()).collect();
        assert_eq!(texts, vec!["a", "b"]);
        assert_eq!(q.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_queue_is_fifo(ops in proptest::collection::vec(any::<bool>(), 1..200)) {
            let pool = RecordPool::new(16);
            let mut q = Queue::new();
            let mut model = std::collections::VecDeque::new();
            let mut next = 0u32;
            for push in ops {
                if push {
                    let text = next.to_string();
                    q.push(&make(&pool, &text));
                    model.push_back(text);
                    next += 1;
                } else {
                    let got = q.pop().map(|r| r.text().to_string());
                    prop_assert_eq!(got, model.pop_front());
                }
                prop_assert_eq!(q.len(), model.len());
            }
            q.clear();
            prop_assert_eq!(pool.stats().in_flight(), 0);
        }
    }
}
