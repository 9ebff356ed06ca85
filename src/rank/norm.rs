/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Error norms.
//!
//! The distance between successive approximations can be measured using the
//! 𝓁₁, 𝓁₂ or 𝓁∞ norm of their difference. Each [`Norm`] can be computed
//! over two full vectors, either [sequentially](Norm::distance) or [in
//! parallel](Norm::par_distance), or incrementally, one pair of old/new values
//! at a time, using a [`NormAccum`]. Partial results computed by different
//! threads on disjoint sets of nodes are [combined](Norm::combine) using the
//! reduction of the norm.

use crate::utils::RAYON_MIN_LEN;
use kahan::KahanSum;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};

/// A norm used to measure the error between successive approximations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Norm {
    /// Sum of absolute differences.
    #[default]
    L1,
    /// Square root of the sum of squared differences.
    L2,
    /// Maximum absolute difference.
    Linf,
}

impl std::fmt::Display for Norm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Norm::L1 => f.write_str("L1"),
            Norm::L2 => f.write_str("L2"),
            Norm::Linf => f.write_str("L∞"),
        }
    }
}

impl Norm {
    /// Returns the distance between `x` and `y` in this norm.
    ///
    /// # Panics
    ///
    /// Panics if the two vectors have different lengths.
    pub fn distance(&self, x: &[f64], y: &[f64]) -> f64 {
        assert_eq!(x.len(), y.len());
        let mut accum = self.accum();
        for (&a, &b) in x.iter().zip(y) {
            accum.add(a, b);
        }
        accum.value()
    }

    /// Returns the distance between `x` and `y` in this norm, computed in
    /// parallel using the current Rayon thread pool.
    ///
    /// # Panics
    ///
    /// Panics if the two vectors have different lengths.
    pub fn par_distance(&self, x: &[f64], y: &[f64]) -> f64 {
        assert_eq!(x.len(), y.len());
        match self {
            Norm::Linf => x
                .par_iter()
                .with_min_len(RAYON_MIN_LEN)
                .zip(y)
                .map(|(&a, &b)| (a - b).abs())
                .reduce(|| 0.0, f64::max),
            Norm::L1 | Norm::L2 => {
                let l2 = *self == Norm::L2;
                let sum = x
                    .par_iter()
                    .with_min_len(RAYON_MIN_LEN)
                    .zip(y)
                    .fold(KahanSum::<f64>::new, |acc, (&a, &b)| {
                        let d = (a - b).abs();
                        acc + (if l2 { d * d } else { d })
                    })
                    .reduce(KahanSum::<f64>::new, |acc0, acc1| acc0 + acc1)
                    .sum();
                if l2 {
                    sum.sqrt()
                } else {
                    sum
                }
            }
        }
    }

    /// Returns a new empty incremental accumulator for this norm.
    pub fn accum(&self) -> NormAccum {
        NormAccum::new(*self)
    }

    /// Combines values of this norm computed on disjoint sets of
    /// coordinates into the value over their union.
    ///
    /// An empty set of partial values yields zero; infinite partial values
    /// propagate.
    pub fn combine(&self, partials: impl IntoIterator<Item = f64>) -> f64 {
        let partials = partials.into_iter();
        match self {
            Norm::L1 => partials.sum(),
            Norm::L2 => partials.map(|x| x * x).sum::<f64>().sqrt(),
            Norm::Linf => partials.fold(0.0, f64::max),
        }
    }
}

/// An incremental accumulator for a [`Norm`].
///
/// Differences are added one at a time with [`add`](NormAccum::add), and
/// accumulators of the same norm can be [merged](NormAccum::merge).
#[derive(Debug)]
pub struct NormAccum {
    norm: Norm,
    sum: KahanSum<f64>,
    max: f64,
}

impl NormAccum {
    /// Creates a new empty accumulator.
    pub fn new(norm: Norm) -> Self {
        Self {
            norm,
            sum: KahanSum::new(),
            max: 0.0,
        }
    }

    /// Returns the norm of this accumulator.
    pub fn norm(&self) -> Norm {
        self.norm
    }

    /// Adds the difference between an old and a new value.
    #[inline(always)]
    pub fn add(&mut self, old: f64, new: f64) {
        let d = (new - old).abs();
        match self.norm {
            Norm::L1 => self.sum += d,
            Norm::L2 => self.sum += d * d,
            Norm::Linf => self.max = self.max.max(d),
        }
    }

    /// Merges another accumulator of the same norm into this one.
    pub fn merge(&mut self, other: NormAccum) {
        debug_assert_eq!(self.norm, other.norm);
        let sum = std::mem::replace(&mut self.sum, KahanSum::new());
        self.sum = sum + other.sum;
        self.max = self.max.max(other.max);
    }

    /// Returns the current value of the norm.
    pub fn value(&self) -> f64 {
        match self.norm {
            Norm::L1 => self.sum.sum(),
            Norm::L2 => self.sum.sum().sqrt(),
            Norm::Linf => self.max,
        }
    }
}
