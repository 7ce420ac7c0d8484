//! A keyed priority queue which yields the item having the smallest
//! priority value first.
//!
//! The event scheduler keys pending events by device and prioritises
//! them by due time, so the earliest-due event must come out first.
//! [`KeyedPriorityQueue`] yields the greatest priority first, so we
//! wrap the priority in [`Earliest`] which inverts the ordering.
use std::cmp::Ordering;
use std::fmt::{self, Debug, Formatter};
use std::hash::Hash;

use keyed_priority_queue::KeyedPriorityQueue;

#[derive(Debug)]
struct Earliest<T> {
    inner: T,
}

impl<T> From<T> for Earliest<T> {
    fn from(inner: T) -> Earliest<T> {
        Earliest { inner }
    }
}

impl<T: Ord> PartialOrd for Earliest<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Eq> Eq for Earliest<T> {}

impl<T: Eq> PartialEq for Earliest<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T: Ord> Ord for Earliest<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.inner.cmp(&self.inner)
    }
}

#[test]
fn test_earliest_order() {
    assert_eq!(Earliest::from(1), Earliest::from(1));
    assert!(Earliest::from(1) < Earliest::from(0));
    assert!(Earliest::from(5) > Earliest::from(9));
}

pub struct KeyedEarliestFirstQueue<K: Hash + Eq, P: Ord> {
    items: KeyedPriorityQueue<K, Earliest<P>>,
}

impl<K, P> KeyedEarliestFirstQueue<K, P>
where
    K: Hash + Eq,
    P: Ord,
{
    pub fn new() -> KeyedEarliestFirstQueue<K, P> {
        KeyedEarliestFirstQueue {
            items: KeyedPriorityQueue::new(),
        }
    }

    pub fn peek(&self) -> Option<(&K, &P)> {
        self.items.peek().map(|(k, p)| (k, &p.inner))
    }

    pub fn pop(&mut self) -> Option<(K, P)> {
        self.items.pop().map(|(k, p)| (k, p.inner))
    }

    /// Removes and returns the first item, but only if its priority
    /// is no later than `limit`.
    pub fn pop_if_not_after(&mut self, limit: &P) -> Option<(K, P)> {
        let due = matches!(self.peek(), Some((_, p)) if p <= limit);
        if due {
            self.pop()
        } else {
            None
        }
    }

    /// Inserts an item.  If `key` was already present, its priority
    /// is replaced and the previous priority is returned.
    pub fn push(&mut self, key: K, priority: P) -> Option<P> {
        self.items
            .push(key, Earliest::from(priority))
            .map(|old| old.inner)
    }

    /// Removes the item identified by `key`, returning its priority
    /// if it was present.
    pub fn remove(&mut self, key: &K) -> Option<P> {
        self.items.remove(key).map(|p| p.inner)
    }

    pub fn get_priority(&self, key: &K) -> Option<&P> {
        self.items.get_priority(key).map(|p| &p.inner)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<K, P> Default for KeyedEarliestFirstQueue<K, P>
where
    K: Hash + Eq,
    P: Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, P> Debug for KeyedEarliestFirstQueue<K, P>
where
    K: Hash + Eq + Debug,
    P: Ord + Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedEarliestFirstQueue")
            .field("items", &self.items)
            .finish()
    }
}

#[test]
fn test_empty() {
    let mut q: KeyedEarliestFirstQueue<usize, usize> = KeyedEarliestFirstQueue::default();
    assert!(q.is_empty());
    assert_eq!(0, q.len());
    assert_eq!(q.peek(), None);
    assert_eq!(q.pop(), None);
}

#[test]
fn test_repeat_push_replaces_priority() {
    let mut q: KeyedEarliestFirstQueue<usize, u32> = KeyedEarliestFirstQueue::new();
    assert_eq!(q.push(0, 20), None);
    assert_eq!(q.push(0, 40), Some(20));
    assert_eq!(q.push(0, 30), Some(40));
    assert_eq!(q.len(), 1);
    assert_eq!(q.pop(), Some((0, 30)));
    assert!(q.is_empty());
}

#[test]
fn test_ordering() {
    let mut q: KeyedEarliestFirstQueue<char, u32> = KeyedEarliestFirstQueue::new();
    q.push('b', 80);
    q.push('a', 20);
    q.push('c', 50);
    assert_eq!(q.pop(), Some(('a', 20)));
    assert_eq!(q.pop(), Some(('c', 50)));
    assert_eq!(q.pop(), Some(('b', 80)));
    assert!(q.is_empty());
}

#[test]
fn test_remove() {
    let mut q: KeyedEarliestFirstQueue<char, u32> = KeyedEarliestFirstQueue::new();
    q.push('a', 20);
    q.push('b', 30);
    assert_eq!(q.remove(&'a'), Some(20));
    assert_eq!(q.remove(&'a'), None);
    assert_eq!(q.get_priority(&'b'), Some(&30));
    assert_eq!(q.pop(), Some(('b', 30)));
}

#[test]
fn test_pop_if_not_after() {
    let mut q: KeyedEarliestFirstQueue<char, u32> = KeyedEarliestFirstQueue::new();
    q.push('a', 20);
    q.push('b', 30);
    assert_eq!(q.pop_if_not_after(&10), None);
    assert_eq!(q.pop_if_not_after(&20), Some(('a', 20)));
    assert_eq!(q.pop_if_not_after(&25), None);
    assert_eq!(q.pop_if_not_after(&99), Some(('b', 30)));
    assert_eq!(q.pop_if_not_after(&99), None);
}
