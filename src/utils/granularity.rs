/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/// Granularity of the chunks handed to worker threads, specified
/// transparently by nodes or arcs.
///
/// The rank engines split the node set into chunks that threads claim from a
/// shared counter, and steal a quarter of a chunk at a time from each other.
/// This enum makes it possible to specify the chunk size either directly as a
/// number of nodes or tentatively as a number of arcs; the conversion is done
/// by [`node_granularity`](Self::node_granularity).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Granularity {
    /// Node granularity: each chunk contains the specified number of nodes.
    Nodes(usize),
    /// Arc granularity: each chunk contains a number of nodes whose sum of
    /// indegrees is, tentatively, the specified number of arcs.
    Arcs(u64),
}

impl core::default::Default for Granularity {
    /// Returns a default granularity of 2048 nodes.
    fn default() -> Self {
        Self::Nodes(2048)
    }
}

impl Granularity {
    /// Returns a node granularity for a given number of nodes and arcs.
    ///
    /// For the variant [`Nodes`](Self::Nodes), the specified number of nodes is
    /// returned. For the variant [`Arcs`](Self::Arcs), the number of nodes is
    /// computed as the specified number of arcs divided by the average
    /// degree. The result is never zero.
    pub fn node_granularity(&self, num_nodes: usize, num_arcs: u64) -> usize {
        match self {
            Self::Nodes(n) => (*n).max(1),
            Self::Arcs(n) => {
                let average_degree = num_arcs as f64 / num_nodes.max(1) as f64;
                if average_degree == 0.0 {
                    return num_nodes.max(1);
                }
                (*n as f64 / average_degree)
                    .min(usize::MAX as f64)
                    .ceil()
                    .max(1.0) as usize
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_granularity() {
        assert_eq!(Granularity::default().node_granularity(10, 100), 2048);
        assert_eq!(Granularity::Nodes(0).node_granularity(10, 100), 1);
        // Average degree 10
        assert_eq!(Granularity::Arcs(1000).node_granularity(10, 100), 100);
        assert_eq!(Granularity::Arcs(5).node_granularity(10, 100), 1);
        // No arcs at all
        assert_eq!(Granularity::Arcs(5).node_granularity(10, 0), 10);
    }
}
