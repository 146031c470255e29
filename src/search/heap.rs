//! Bounded top-k heap.
//!
//! A max-heap with an explicit capacity: while under capacity every
//! candidate is admitted; at capacity a candidate must beat the current
//! worst, which is popped to make room. Draining yields results ascending
//! by distance.

use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::query::QueryResult;
use crate::record::Key;

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeapEntry {
    distance: OrderedFloat<f32>,
    key: Key,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .cmp(&other.distance)
            .then_with(|| self.key.cmp(&other.key))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Max-heap of at most `capacity` results, ordered by aggregate distance.
#[derive(Debug)]
pub struct TopKHeap {
    capacity: usize,
    heap: BinaryHeap<HeapEntry>,
}

impl TopKHeap {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity + 1),
        }
    }

    /// Admits a candidate if the heap is under capacity or the candidate
    /// beats the current worst.
    pub fn insert(&mut self, key: Key, distance: f32) {
        if self.capacity == 0 {
            return;
        }
        if self.heap.len() < self.capacity {
            self.heap.push(HeapEntry {
                distance: OrderedFloat(distance),
                key,
            });
        } else if let Some(top) = self.heap.peek() {
            if distance < top.distance.0 {
                self.heap.pop();
                self.heap.push(HeapEntry {
                    distance: OrderedFloat(distance),
                    key,
                });
            }
        }
    }

    /// The largest accepted distance, i.e. the current k-th best.
    pub fn worst(&self) -> Option<f32> {
        self.heap.peek().map(|entry| entry.distance.0)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() == self.capacity
    }

    /// Drains into a list ascending by distance.
    pub fn into_sorted(self) -> Vec<QueryResult> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|entry| QueryResult {
                key: entry.key,
                distance: entry.distance.0,
            })
            .collect()
    }
}
