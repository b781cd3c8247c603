//! A priority queue that stores arbitrary data sorted by time
//!
//! Defines a `Queue<T, P>` that is intended to store a queue of items of type
//! `T` - sorted by `f64` time and definable priority `P` - called 'plans'.
//! Adding a plan and retrieving the earliest plan are both *O*(log(*n*)).
//!
//! This queue is used by `Context` to store future events where some callback
//! closure `FnOnce(&mut Context)` will be executed at a given point in time.
//! Plans are never cancelled: once a disease transition is scheduled it fires.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A priority queue that stores arbitrary data sorted by time
///
/// Items of type `T` are stored in order by `f64` time and handed out as `Plan<T>`.
/// Plans can have priorities given by some specified orderable type `P`.
/// If two plans are scheduled for the same time then the plan with the lowest
/// priority is placed earlier. If two plans have the same time and priority then
/// the plan that was added first is placed earlier, which keeps draws made inside
/// the callbacks reproducible under a fixed seed.
pub struct Queue<T, P: Eq + PartialEq + Ord> {
    queue: BinaryHeap<Entry<T, P>>,
    plan_counter: u64,
}

impl<T, P: Eq + PartialEq + Ord> Queue<T, P> {
    /// Create a new empty `Queue<T, P>`
    #[must_use]
    pub fn new() -> Queue<T, P> {
        Queue {
            queue: BinaryHeap::new(),
            plan_counter: 0,
        }
    }

    /// Add a plan to the queue at the specified time
    pub fn add_plan(&mut self, time: f64, data: T, priority: P) {
        let id = self.plan_counter;
        self.queue.push(Entry {
            time,
            priority,
            id,
            data,
        });
        self.plan_counter += 1;
    }

    /// Retrieve the earliest plan in the queue
    ///
    /// Returns the next plan if it exists or else `None` if the queue is empty
    pub fn get_next_plan(&mut self) -> Option<Plan<T>> {
        self.queue.pop().map(|entry| Plan {
            time: entry.time,
            data: entry.data,
        })
    }

    /// Time of the earliest plan, if any
    #[must_use]
    pub fn next_time(&self) -> Option<f64> {
        self.queue.peek().map(|entry| entry.time)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl<T, P: Eq + PartialEq + Ord> Default for Queue<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

/// A time, priority and insertion id, plus the payload of the plan
struct Entry<T, P: Eq + PartialEq + Ord> {
    time: f64,
    priority: P,
    id: u64,
    data: T,
}

impl<T, P: Eq + PartialEq + Ord> PartialEq for Entry<T, P> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T, P: Eq + PartialEq + Ord> Eq for Entry<T, P> {}

impl<T, P: Eq + PartialEq + Ord> PartialOrd for Entry<T, P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Entries are ordered in increasing order by time, priority, and then
/// insertion id. `BinaryHeap` is a max-heap so every comparison is reversed.
impl<T, P: Eq + PartialEq + Ord> Ord for Entry<T, P> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Times are validated by `Context` so `total_cmp` agrees with `partial_cmp` here.
        let time_ordering = self.time.total_cmp(&other.time).reverse();
        match time_ordering {
            Ordering::Equal => match self.priority.cmp(&other.priority).reverse() {
                Ordering::Equal => self.id.cmp(&other.id).reverse(),
                priority_ordering => priority_ordering,
            },
            _ => time_ordering,
        }
    }
}

/// A plan that holds data of type `T` intended to be used at the specified time
pub struct Plan<T> {
    pub time: f64,
    pub data: T,
}
