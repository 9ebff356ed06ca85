/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Parallel PageRank with work stealing and barrier-free iterations.
//!
//! **Warning**: since we need to enumerate the _predecessors_ of a node, the
//! graph passed to [`compute`] must be the CSR representation of the
//! **transpose** of the graph (see [`CsrView`](crate::graphs::CsrView)).
//!
//! # The formula
//!
//! If we denote with *P* the row-normalized adjacency matrix of the graph
//! (with zero rows for dead ends), with α the damping factor and with *n* the
//! number of nodes, each pass computes
//!
//! > **x**′ = α **x** *P* + *c*₀ **1**,
//!
//! where the _teleport term_ *c*₀ is (1 − α) / *n*. Optionally, the rank of
//! dead ends is redistributed uniformly, in which case *c*₀ is (1 − α) / *n* +
//! α ∑_(*u* dead end) *xᵤ* / *n*: the resulting vector is stochastic, but
//! the teleport term must be recomputed at each pass. On a graph without dead
//! ends the two choices give exactly the same results.
//!
//! # Engines
//!
//! The [schedule](Schedule) selects one of three engines:
//!
//! - [`Sequential`](Schedule::Sequential): a single thread performs all the
//!   passes;
//! - [`Synchronized`](Schedule::Synchronized): all threads perform the same
//!   pass, claiming chunks of nodes from a shared cursor, and wait for each
//!   other at the end of each pass;
//! - [`BarrierFree`](Schedule::BarrierFree): each thread performs its own
//!   passes on its own nodes, without waiting for the others.
//!
//! In the last two cases, threads that run out of work may [steal](Scheduler)
//! nodes from other threads. Ownership of nodes is transferred by [range
//! cells](RangeCell), so that each node is updated by exactly one thread in
//! each pass.
//!
//! Updates can be [unordered or ordered](UpdateOrder): in the first case new
//! ranks are written to a separate vector (Jacobi iteration), in the second
//! case they are written in place (Gauss–Seidel-like iteration).
//!
//! # Load injection
//!
//! To study the behavior of the engines under imbalance, threads can be made
//! to [stall](LoadInjector) with a given probability before processing each
//! node. Stalls change timing, but never results.

mod barrier_free;
mod buffers;
mod engine;
mod kernel;
mod norm;
mod options;
mod range;
pub mod scheduler;
mod sequential;
mod synchronized;
mod work;

pub use engine::*;
pub use norm::*;
pub use options::*;
pub use range::*;
pub use scheduler::{Scheduler, Stolen};
pub use work::*;
