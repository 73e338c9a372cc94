use crate::safemap::SafeMap;
use crate::tree::{Node, Policy, SearchResult, SearchTree};
use crate::Cost;

/// Weighted SIPP: `f = g + w * h` with `w >= 1`. The inflated heuristic may
/// be inconsistent, so a closed state reached again with a better `f` is
/// reopened ([`Policy::Reexpansion`]); the returned plan is at most `w` times
/// longer than the optimum.
///
/// Panics if `w < 1`.
pub fn wsipp(
    map: &SafeMap,
    start: (i32, i32),
    goal: (i32, i32),
    w: f64,
    heuristic: impl Fn(i32, i32, i32, i32) -> f64,
) -> SearchResult {
    assert!(w >= 1.0, "heuristic weight must be >= 1, got {}", w);

    let mut tree = SearchTree::new(Policy::Reexpansion);
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
        let (i, j, g) = {
            let n = tree.node(id);
            (n.i, n.j, n.g)
        };
        if (i, j) == goal {
            tracing::debug!(steps, reexpanded = tree.reexpanded(), length = g, w, "wsipp reached the goal");
            return tree.into_result(true, Some(id), steps);
        }

        for (ni, nj, nt) in map.neighbours(i, j, g) {
            let h = heuristic(ni, nj, goal.0, goal.1);
            let child = tree.alloc(Node {
                i: ni,
                j: nj,
                g: nt,
                h,
                f: Cost::from(nt as f64 + w * h),
                interval: map.get_interval(ni, nj, nt).unwrap(),
                optimal: true,
                parent: Some(id),
            });
            // no pre-filter: the frontier decides between drop, push and reopen
            tree.add_to_open(tree.node(child).interval_key(), child);
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
    wsipp(&map, (0, 0), (2, 2), 0.5, manhattan_distance);
}

#[test]
fn weight_one_is_plain_sipp() {
    for seed in 0..6_u64 {
        let rng = &mut StdRng::seed_from_u64(seed);
        let trajectories = random_trajectories(rng, 4, 8, 8, 3);
        let map = SafeMap::new(&open_grid(8, 8), &trajectories);

        let optimal = sipp(&map, (0, 0), (7, 7), manhattan_distance);
        let weighted = wsipp(&map, (0, 0), (7, 7), 1.0, manhattan_distance);
        assert_eq!(weighted.found, optimal.found);
        assert_eq!(weighted.length(), optimal.length());
    }
}

#[test]
fn inflation_stays_within_the_advertised_bound() {
    for seed in 0..6_u64 {
        let rng = &mut StdRng::seed_from_u64(0xBEEF ^ seed);
        let trajectories = random_trajectories(rng, 5, 10, 10, 3);
        let map = SafeMap::new(&open_grid(10, 10), &trajectories);

        let optimal = sipp(&map, (0, 0), (9, 9), manhattan_distance);
        for w in [1.5, 2.0, 3.0] {
            let weighted = wsipp(&map, (0, 0), (9, 9), w, manhattan_distance);
            assert_eq!(weighted.found, optimal.found);
            let (Some(len), Some(opt)) = (weighted.length(), optimal.length()) else { continue };
            assert!(
                len as f64 <= w * opt as f64,
                "w = {}: {} exceeds {} * {}",
                w,
                len,
                w,
                opt
            );

            let (steps, _) = make_path(&weighted).unwrap();
            assert_path_valid(&trajectories, &steps);
        }
    }
}

#[test]
fn an_exact_heuristic_keeps_the_weighted_dive_optimal() {
    // with nothing in the way the inflated search walks straight to the goal
    let map = SafeMap::new(&open_grid(10, 10), &[]);
    for w in [1.0, 2.0, 3.0] {
        let result = wsipp(&map, (0, 0), (9, 9), w, manhattan_distance);
        assert_eq!(result.length(), Some(18));
    }
}
