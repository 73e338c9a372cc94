use crate::safemap::SafeMap;
use crate::tree::{Node, Policy, SearchResult, SearchTree};
use crate::Cost;

/// Dual-variant weighted SIPP. Every reached `(cell, interval)` is tracked
/// twice: an inflated variant keyed `f = g + w * h` that explores
/// aggressively, and an optimal variant keyed `f = w * (g + h)` that
/// preserves the `w`-suboptimality guarantee. Inflated successors are always
/// generated; optimal successors only from optimal parents. Neither variant
/// is ever reopened: ordering by `w * (g + h)` is a monotone transform of
/// the consistent `g + h`, so the optimal lane never needs it.
///
/// Panics if `w < 1`.
pub fn wsipp_d(
    map: &SafeMap,
    start: (i32, i32),
    goal: (i32, i32),
    w: f64,
    heuristic: impl Fn(i32, i32, i32, i32) -> f64,
) -> SearchResult {
    assert!(w >= 1.0, "heuristic weight must be >= 1, got {}", w);

    let mut tree = SearchTree::new(Policy::NoReexpansion);
    let mut steps = 0;

    if !map.traversable(start.0, start.1, 0) {
        tracing::debug!(?start, "start cell is unsafe at t = 0");
        return tree.into_result(false, None, steps);
    }

    let h = heuristic(start.0, start.1, goal.0, goal.1);
    let root = tree.alloc(Node {
        i: start.0,
        j: start.1,
        g: 0,
        h,
        f: Cost::from(w * h),
        interval: 0,
        optimal: true,
        parent: None,
    });
    tree.add_to_open(tree.node(root).interval_key(), root);

    while !tree.open_is_empty() {
        steps += 1;
        let Some(id) = tree.pop_best() else {
            return tree.into_result(false, None, steps);
        };
        let (i, j, g, expand_optimal) = {
            let n = tree.node(id);
            (n.i, n.j, n.g, n.optimal)
        };
        if (i, j) == goal {
            tracing::debug!(steps, length = g, w, "wsipp_d reached the goal");
            return tree.into_result(true, Some(id), steps);
        }

        for (ni, nj, nt) in map.neighbours(i, j, g) {
            let h = heuristic(ni, nj, goal.0, goal.1);
            let interval = map.get_interval(ni, nj, nt).unwrap();

            let inflated = tree.alloc(Node {
                i: ni,
                j: nj,
                g: nt,
                h,
                f: Cost::from(nt as f64 + w * h),
                interval,
                optimal: false,
                parent: Some(id),
            });
            let key = tree.node(inflated).interval_key();
            if !tree.was_expanded(&key) {
                tree.add_to_open(key, inflated);
            }

            if expand_optimal {
                let optimal = tree.alloc(Node {
                    i: ni,
                    j: nj,
                    g: nt,
                    h,
                    f: Cost::from(w * (nt as f64 + h)),
                    interval,
                    optimal: true,
                    parent: Some(id),
                });
                let key = tree.node(optimal).interval_key();
                if !tree.was_expanded(&key) {
                    tree.add_to_open(key, optimal);
                }
            }
        }

        tree.add_to_closed(tree.node(id).interval_key(), id);
    }

    tree.into_result(false, None, steps)
}

//

#[cfg(test)]
use rand::{prelude::StdRng, SeedableRng};

#[cfg(test)]
use crate::grid::{manhattan_distance, Grid};
#[cfg(test)]
use crate::path::{assert_path_valid, make_path};
#[cfg(test)]
use crate::scenario::random_trajectories;
#[cfg(test)]
use crate::sipp::sipp;

#[cfg(test)]
fn open_grid(height: i32, width: i32) -> Grid {
    Grid::from_cells(vec![vec![false; width as usize]; height as usize])
}

#[test]
#[should_panic(expected = "heuristic weight must be >= 1")]
fn weights_below_one_are_rejected() {
    let map = SafeMap::new(&open_grid(3, 3), &[]);
    wsipp_d(&map, (0, 0), (2, 2), 0.9, manhattan_distance);
}

#[test]
fn both_lanes_agree_with_sipp_at_weight_one() {
    for seed in 0..6_u64 {
        let rng = &mut StdRng::seed_from_u64(seed);
        let trajectories = random_trajectories(rng, 4, 8, 8, 3);
        let map = SafeMap::new(&open_grid(8, 8), &trajectories);

        let optimal = sipp(&map, (0, 0), (7, 7), manhattan_distance);
        let dual = wsipp_d(&map, (0, 0), (7, 7), 1.0, manhattan_distance);
        assert_eq!(dual.found, optimal.found);
        assert_eq!(dual.length(), optimal.length());
    }
}

#[test]
fn the_dual_queue_keeps_the_suboptimality_bound() {
    for seed in 0..6_u64 {
        let rng = &mut StdRng::seed_from_u64(0xD00D ^ seed);
        let trajectories = random_trajectories(rng, 5, 10, 10, 3);
        let map = SafeMap::new(&open_grid(10, 10), &trajectories);

        let optimal = sipp(&map, (0, 0), (9, 9), manhattan_distance);
        let dual = wsipp_d(&map, (0, 0), (9, 9), 2.0, manhattan_distance);
        assert_eq!(dual.found, optimal.found);

        let (Some(len), Some(opt)) = (dual.length(), optimal.length()) else { continue };
        assert!(len <= 2 * opt, "{} exceeds 2 * {}", len, opt);

        let (steps, _) = make_path(&dual).unwrap();
        assert_path_valid(&trajectories, &steps);
    }
}

#[test]
fn an_exact_heuristic_needs_no_detour() {
    let map = SafeMap::new(&open_grid(10, 10), &[]);
    let result = wsipp_d(&map, (0, 0), (9, 9), 2.0, manhattan_distance);
    assert_eq!(result.length(), Some(18));
}
