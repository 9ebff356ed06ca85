/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Miscellaneous utilities.

mod granularity;
pub use granularity::*;

mod primes;
pub use primes::*;

/// The minimum length of the slices processed by a Rayon task in
/// data-parallel reductions over rank vectors.
pub const RAYON_MIN_LEN: usize = 1 << 12;
