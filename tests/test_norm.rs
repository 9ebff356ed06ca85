/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use barrierfree_pagerank::rank::Norm;
use rand::{rngs::SmallRng, Rng, SeedableRng};

#[test]
fn test_distance() {
    let x = [1.0, 2.0, 3.0, 4.0];
    let y = [1.0, 0.0, 6.0, 4.0];
    assert_eq!(Norm::L1.distance(&x, &y), 5.0);
    assert_eq!(Norm::L2.distance(&x, &y), 13.0_f64.sqrt());
    assert_eq!(Norm::Linf.distance(&x, &y), 3.0);
    for norm in [Norm::L1, Norm::L2, Norm::Linf] {
        assert_eq!(norm.distance(&x, &x), 0.0);
        assert_eq!(norm.distance(&[], &[]), 0.0);
    }
}

#[test]
fn test_par_distance() {
    let mut rng = SmallRng::seed_from_u64(0);
    let x: Vec<f64> = (0..100_000).map(|_| rng.random::<f64>()).collect();
    let y: Vec<f64> = (0..100_000).map(|_| rng.random::<f64>()).collect();
    for norm in [Norm::L1, Norm::L2, Norm::Linf] {
        let seq = norm.distance(&x, &y);
        let par = norm.par_distance(&x, &y);
        assert!((seq - par).abs() <= 1E-12 * seq, "{norm}: {seq} != {par}");
    }
}

#[test]
fn test_merge_and_combine() {
    let mut rng = SmallRng::seed_from_u64(1);
    let x: Vec<f64> = (0..1000).map(|_| rng.random::<f64>()).collect();
    let y: Vec<f64> = (0..1000).map(|_| rng.random::<f64>()).collect();
    for norm in [Norm::L1, Norm::L2, Norm::Linf] {
        let whole = norm.distance(&x, &y);

        // Three disjoint parts, as if computed by three threads
        let bounds = [0, 100, 700, 1000];
        let mut merged = norm.accum();
        let mut partials = vec![];
        for w in bounds.windows(2) {
            let mut accum = norm.accum();
            for i in w[0]..w[1] {
                accum.add(x[i], y[i]);
            }
            partials.push(accum.value());
            merged.merge(accum);
        }
        assert!((merged.value() - whole).abs() <= 1E-12 * whole);
        assert!((norm.combine(partials) - whole).abs() <= 1E-12 * whole);
    }
}

#[test]
fn test_combine_edge_cases() {
    for norm in [Norm::L1, Norm::L2, Norm::Linf] {
        assert_eq!(norm.combine([]), 0.0);
        assert_eq!(norm.combine([0.5, f64::INFINITY]), f64::INFINITY);
    }
    assert_eq!(Norm::L1.combine([1.0, 2.0]), 3.0);
    assert_eq!(Norm::L2.combine([3.0, 4.0]), 5.0);
    assert_eq!(Norm::Linf.combine([1.0, 2.0]), 2.0);
}

#[test]
fn test_display() {
    assert_eq!(Norm::L1.to_string(), "L1");
    assert_eq!(Norm::L2.to_string(), "L2");
    assert_eq!(Norm::Linf.to_string(), "L∞");
}
