/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Reading graphs from ASCII lists of arcs.
//!
//! Each line contains a source and a target node, given as numerical
//! identifiers separated by a separator character (by default, any
//! whitespace). Empty lines and lines starting with the comment symbol are
//! skipped. The number of nodes is one plus the largest identifier
//! appearing in the list, unless it is specified explicitly.

use super::{CsrGraph, GraphError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Options for parsing arc lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArcsFormat {
    /// The separator between source and target; `None` means any whitespace.
    pub separator: Option<char>,
    /// Lines starting with this character are skipped.
    pub comment: char,
    /// The number of nodes; if `None`, it is inferred from the arcs.
    pub num_nodes: Option<usize>,
}

impl core::default::Default for ArcsFormat {
    fn default() -> Self {
        Self {
            separator: None,
            comment: '#',
            num_nodes: None,
        }
    }
}

fn parse_node(token: Option<&str>, line: usize, what: &str) -> Result<usize, GraphError> {
    let token = token.ok_or_else(|| GraphError::Parse {
        line,
        reason: format!("missing {what}"),
    })?;
    token.trim().parse::<usize>().map_err(|e| GraphError::Parse {
        line,
        reason: format!("cannot parse {what} {token:?}: {e}"),
    })
}

/// Reads a list of arcs of the **original** graph from a reader, returning
/// the CSR representation of its transpose.
///
/// Line numbers in [parse errors](GraphError::Parse) start from one.
pub fn read_arcs(reader: impl BufRead, format: &ArcsFormat) -> Result<CsrGraph, GraphError> {
    let mut arcs = vec![];
    let mut max_node = None;

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(format.comment) {
            continue;
        }
        let mut tokens: Box<dyn Iterator<Item = &str>> = match format.separator {
            Some(sep) => Box::new(trimmed.split(sep)),
            None => Box::new(trimmed.split_whitespace()),
        };
        let src = parse_node(tokens.next(), line_num + 1, "source")?;
        let dst = parse_node(tokens.next(), line_num + 1, "target")?;
        max_node = Some(max_node.unwrap_or(0).max(src).max(dst));
        arcs.push((src, dst));
    }

    let inferred = max_node.map_or(0, |m| m + 1);
    let num_nodes = match format.num_nodes {
        Some(n) if n < inferred => {
            return Err(GraphError::NodeOutOfRange {
                node: inferred - 1,
                num_nodes: n,
            })
        }
        Some(n) => n,
        None => inferred,
    };

    log::info!("Read {} arcs on {} nodes", arcs.len(), num_nodes);
    Ok(CsrGraph::from_arcs(num_nodes, arcs))
}

/// Reads a list of arcs from a file.
///
/// See [`read_arcs`].
pub fn load_arcs(path: impl AsRef<Path>, format: &ArcsFormat) -> Result<CsrGraph, GraphError> {
    let file = File::open(path.as_ref())?;
    read_arcs(BufReader::new(file), format)
}
