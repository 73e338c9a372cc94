use crate::safemap::SafeMap;
use crate::tree::{Node, Policy, SearchResult, SearchTree};
use crate::Cost;

/// Safe-interval path planning: A* over `(cell, interval)` states. With an
/// admissible, consistent heuristic the returned plan is optimal, and no
/// closed state is ever reopened.
///
/// A start cell that is unsafe at `t = 0` yields a clean `found = false`.
pub fn sipp(
    map: &SafeMap,
    start: (i32, i32),
    goal: (i32, i32),
    heuristic: impl Fn(i32, i32, i32, i32) -> f64,
) -> SearchResult {
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
        f: Cost::from(h),
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
            tracing::debug!(steps, nodes = tree.nodes_created(), length = g, "sipp reached the goal");
            return tree.into_result(true, Some(id), steps);
        }

        for (ni, nj, nt) in map.neighbours(i, j, g) {
            let h = heuristic(ni, nj, goal.0, goal.1);
            let child = tree.alloc(Node {
                i: ni,
                j: nj,
                g: nt,
                h,
                f: Cost::from(nt as f64 + h),
                interval: map.get_interval(ni, nj, nt).unwrap(),
                optimal: true,
                parent: Some(id),
            });
            let key = tree.node(child).interval_key();
            if !tree.was_expanded(&key) {
                tree.add_to_open(key, child);
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
fn open_grid(height: i32, width: i32) -> Grid {
    Grid::from_cells(vec![vec![false; width as usize]; height as usize])
}

#[test]
fn crosses_an_empty_grid_on_the_diagonal() {
    let map = SafeMap::new(&open_grid(5, 5), &[]);
    let result = sipp(&map, (0, 0), (4, 4), manhattan_distance);

    assert!(result.found);
    assert_eq!(result.length(), Some(8));

    let (steps, length) = make_path(&result).unwrap();
    assert_eq!(length, 8);
    assert_eq!(steps.len(), 9);
}

#[test]
fn start_equal_to_goal_is_a_zero_length_plan() {
    let map = SafeMap::new(&open_grid(3, 3), &[]);
    let result = sipp(&map, (1, 1), (1, 1), manhattan_distance);
    assert!(result.found);
    assert_eq!(result.length(), Some(0));
}

#[test]
fn slips_behind_a_marching_obstacle() {
    let trajectories = vec![vec![(0, 2), (1, 2), (2, 2), (3, 2), (4, 2)]];
    let map = SafeMap::new(&open_grid(5, 5), &trajectories);
    let result = sipp(&map, (0, 0), (0, 4), manhattan_distance);

    assert!(result.found);
    // the column is already clear when the agent gets there
    assert_eq!(result.length(), Some(4));

    let (steps, _) = make_path(&result).unwrap();
    assert_path_valid(&trajectories, &steps);
}

#[test]
fn waits_for_a_cell_to_clear_when_that_is_optimal() {
    // (0, 1) is held until t = 2, so the best plan idles at the start once
    let trajectories = vec![vec![(0, 1), (0, 1), (0, 2), (0, 3)]];
    let map = SafeMap::new(&open_grid(1, 4), &trajectories);
    let result = sipp(&map, (0, 0), (0, 2), manhattan_distance);

    assert!(result.found);
    assert_eq!(result.length(), Some(3));

    let (steps, _) = make_path(&result).unwrap();
    assert_eq!(steps[1], crate::path::PathStep { i: 0, j: 0, g: 1 });
    assert_path_valid(&trajectories, &steps);
}

#[test]
fn head_on_corridor_swap_has_no_solution() {
    let trajectories = vec![vec![(0, 2), (0, 1), (0, 0)]];
    let map = SafeMap::new(&open_grid(1, 3), &trajectories);
    let result = sipp(&map, (0, 0), (0, 2), manhattan_distance);
    assert!(!result.found);
    assert!(result.goal.is_none());
}

#[test]
fn a_settled_obstacle_on_the_goal_starves_the_search() {
    let map = SafeMap::new(&open_grid(3, 3), &[vec![(2, 2)]]);
    let result = sipp(&map, (0, 0), (2, 2), manhattan_distance);
    assert!(!result.found);
    assert!(result.steps > 0);
}

#[test]
fn an_unsafe_start_fails_cleanly() {
    let map = SafeMap::new(&open_grid(3, 3), &[vec![(0, 0)]]);
    let result = sipp(&map, (0, 0), (2, 2), manhattan_distance);
    assert!(!result.found);
    assert_eq!(result.nodes_created, 0);
}

#[test]
fn random_instances_yield_dense_collision_free_plans() {
    for seed in 0..8_u64 {
        let rng = &mut StdRng::seed_from_u64(seed);
        let trajectories = random_trajectories(rng, 4, 8, 8, 2);
        let map = SafeMap::new(&open_grid(8, 8), &trajectories);
        let result = sipp(&map, (0, 0), (7, 7), manhattan_distance);
        if !result.found {
            continue;
        }

        let (steps, length) = make_path(&result).unwrap();
        assert_eq!(steps.len() as i64, length + 1);
        for pair in steps.windows(2) {
            assert_eq!(pair[1].g - pair[0].g, 1);
        }
        assert_path_valid(&trajectories, &steps);
    }
}
