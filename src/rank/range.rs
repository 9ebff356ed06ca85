/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! A lock-free cell owning a range of nodes.
//!
//! A [`RangeCell`] stores a half-open range `[begin . . end)` in a single
//! [`AtomicU64`], with `begin` in the upper 32 bits and `end` in the lower 32
//! bits. There is exactly one _owner_, which consumes the range from the
//! front using [`try_acquire`](RangeCell::try_acquire), and any number of
//! _thieves_, which remove suffixes using [`shrink_to`](RangeCell::shrink_to)
//! or [`steal`](RangeCell::steal). Since both ends live in the same word, all
//! operations are a single compare-and-exchange, and a node can be handed out
//! at most once between two [resets](RangeCell::reset).
//!
//! Between resets, `begin` never decreases, `end` never increases, and
//! `begin` ≤ `end`.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

#[inline(always)]
fn pack(begin: usize, end: usize) -> u64 {
    debug_assert!(begin <= u32::MAX as usize && end <= u32::MAX as usize);
    ((begin as u64) << 32) | end as u64
}

#[inline(always)]
fn unpack(word: u64) -> Range<usize> {
    let begin = (word >> 32) as usize;
    let end = (word & u32::MAX as u64) as usize;
    begin..end
}

/// An atomically updated range of nodes with one owner and many thieves.
///
/// # Examples
///
/// ```
/// use barrierfree_pagerank::rank::RangeCell;
///
/// let cell = RangeCell::new(0..10);
/// assert_eq!(cell.try_acquire(3), Some(0..3));
/// assert_eq!(cell.shrink_to(8), Some(8..10));
/// assert_eq!(cell.steal(2), Some(6..8));
/// assert_eq!(cell.get(), 3..6);
/// assert_eq!(cell.try_acquire(5), Some(3..6));
/// assert!(cell.is_empty());
/// ```
#[derive(Debug)]
pub struct RangeCell(AtomicU64);

impl core::default::Default for RangeCell {
    /// Returns an empty cell.
    fn default() -> Self {
        Self(AtomicU64::new(0))
    }
}

impl RangeCell {
    /// The largest node index (plus one) a cell can represent.
    pub const MAX_NODES: usize = u32::MAX as usize;

    /// Creates a new cell containing the given range.
    ///
    /// # Panics
    ///
    /// Panics if the range is not representable.
    pub fn new(range: Range<usize>) -> Self {
        let cell = Self::default();
        cell.reset(range);
        cell
    }

    /// Returns a snapshot of the current range.
    #[inline(always)]
    pub fn get(&self) -> Range<usize> {
        unpack(self.0.load(Ordering::SeqCst))
    }

    /// Returns the number of nodes currently in the range.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.get().len()
    }

    /// Returns true if the range is empty.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.get().is_empty()
    }

    /// Replaces the range.
    ///
    /// This method must be called only by the owner, and only when no thief
    /// could be operating on the previous contents of the cell.
    ///
    /// # Panics
    ///
    /// Panics if `begin` > `end` or if `end` is larger than
    /// [`MAX_NODES`](Self::MAX_NODES).
    pub fn reset(&self, range: Range<usize>) {
        assert!(
            range.start <= range.end && range.end <= Self::MAX_NODES,
            "Range {range:?} cannot be stored in a cell"
        );
        self.0.store(pack(range.start, range.end), Ordering::SeqCst);
    }

    /// Empties the range.
    pub fn clear(&self) {
        self.0.store(0, Ordering::SeqCst);
    }

    /// Removes at most `n` nodes from the front of the range, returning them,
    /// or `None` if the range is empty.
    ///
    /// This method must be called only by the owner.
    #[inline]
    pub fn try_acquire(&self, n: usize) -> Option<Range<usize>> {
        let mut current = self.0.load(Ordering::SeqCst);
        loop {
            let range = unpack(current);
            if range.is_empty() {
                return None;
            }
            let new_begin = range.start + n.min(range.len());
            match self.0.compare_exchange_weak(
                current,
                pack(new_begin, range.end),
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Some(range.start..new_begin),
                Err(actual) => current = actual,
            }
        }
    }

    /// Moves the end of the range to `new_end`, returning the removed suffix
    /// `[new_end . . end)`.
    ///
    /// Returns `None` if `new_end` is not in `[begin . . end)`, which happens
    /// when the owner or another thief got there first; the caller should
    /// treat this as a lost race.
    pub fn shrink_to(&self, new_end: usize) -> Option<Range<usize>> {
        let mut current = self.0.load(Ordering::SeqCst);
        loop {
            let range = unpack(current);
            if new_end < range.start || new_end >= range.end {
                return None;
            }
            match self.0.compare_exchange_weak(
                current,
                pack(range.start, new_end),
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Some(new_end..range.end),
                Err(actual) => current = actual,
            }
        }
    }

    /// Removes at most `n` nodes from the back of the range, returning them,
    /// or `None` if the range is empty.
    pub fn steal(&self, n: usize) -> Option<Range<usize>> {
        let mut current = self.0.load(Ordering::SeqCst);
        loop {
            let range = unpack(current);
            if range.is_empty() || n == 0 {
                return None;
            }
            let new_end = range.end - n.min(range.len());
            match self.0.compare_exchange_weak(
                current,
                pack(range.start, new_end),
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Some(new_end..range.end),
                Err(actual) => current = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn test_owner_and_thief() {
        let cell = RangeCell::new(10..20);
        assert_eq!(cell.len(), 10);
        assert_eq!(cell.try_acquire(4), Some(10..14));
        assert_eq!(cell.shrink_to(13), None);
        assert_eq!(cell.shrink_to(20), None);
        assert_eq!(cell.shrink_to(18), Some(18..20));
        assert_eq!(cell.steal(100), Some(14..18));
        assert_eq!(cell.try_acquire(1), None);
        assert_eq!(cell.steal(1), None);
        assert!(cell.get().start <= cell.get().end);
    }

    #[test]
    fn test_shrink_to_begin() {
        let cell = RangeCell::new(0..5);
        assert_eq!(cell.shrink_to(0), Some(0..5));
        assert!(cell.is_empty());
        cell.reset(3..4);
        assert_eq!(cell.get(), 3..4);
        cell.clear();
        assert!(cell.is_empty());
    }

    #[test]
    fn test_max_nodes() {
        let cell = RangeCell::new(0..RangeCell::MAX_NODES);
        assert_eq!(cell.steal(1), Some(RangeCell::MAX_NODES - 1..RangeCell::MAX_NODES));
        assert_eq!(cell.try_acquire(2), Some(0..2));
    }

    #[test]
    #[should_panic]
    fn test_too_large() {
        RangeCell::new(0..RangeCell::MAX_NODES + 1);
    }

    #[test]
    fn test_concurrent() {
        const N: usize = 100_000;
        let cell = RangeCell::new(0..N);
        let seen = (0..N).map(|_| AtomicBool::new(false)).collect::<Vec<_>>();
        let mark = |range: Range<usize>| {
            for v in range {
                assert!(!seen[v].swap(true, Ordering::Relaxed), "node {v} handed out twice");
            }
        };
        std::thread::scope(|s| {
            s.spawn(|| {
                let mut last = 0;
                while let Some(range) = cell.try_acquire(3) {
                    assert!(range.start >= last);
                    last = range.end;
                    mark(range);
                }
            });
            for t in 0..3 {
                let cell = &cell;
                let mark = &mark;
                s.spawn(move || loop {
                    let range = cell.get();
                    if range.is_empty() {
                        break;
                    }
                    if t % 2 == 0 {
                        if let Some(stolen) = cell.steal(7) {
                            mark(stolen);
                        }
                    } else if let Some(stolen) = cell.shrink_to(range.end - range.len().min(5)) {
                        mark(stolen);
                    }
                });
            }
        });
        assert!(seen.iter().all(|b| b.load(Ordering::Relaxed)));
    }
}
