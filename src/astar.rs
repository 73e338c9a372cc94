use crate::catable::CATable;
use crate::grid::Grid;
use crate::tree::{Node, Policy, SearchResult, SearchTree};
use crate::Cost;

/// Baseline space-time A* over the collision avoidance table: nodes are
/// `(cell, g)` pairs, successors are the four cardinal moves plus waiting,
/// all one timestep later and filtered through [`CATable::move_valid`]. No
/// state is reopened. Exists as the correctness and performance yardstick
/// for the interval searches.
pub fn astar_timesteps(
    grid: &Grid,
    table: &CATable,
    start: (i32, i32),
    goal: (i32, i32),
    heuristic: impl Fn(i32, i32, i32, i32) -> f64,
) -> SearchResult {
    let mut tree = SearchTree::new(Policy::NoReexpansion);
    let mut steps = 0;

    if !grid.traversable(start.0, start.1) || !table.cell_free(start.0, start.1, 0) {
        tracing::debug!(?start, "start cell is blocked at t = 0");
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
    tree.add_to_open(tree.node(root).timestep_key(), root);

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
            tracing::debug!(steps, nodes = tree.nodes_created(), length = g, "astar reached the goal");
            return tree.into_result(true, Some(id), steps);
        }

        let mut cells = grid.neighbours(i, j);
        cells.push((i, j)); // waiting costs a step too
        for (ni, nj) in cells {
            if !table.move_valid(i, j, ni, nj, g) {
                continue;
            }
            let h = heuristic(ni, nj, goal.0, goal.1);
            let child = tree.alloc(Node {
                i: ni,
                j: nj,
                g: g + 1,
                h,
                f: Cost::from((g + 1) as f64 + h),
                interval: 0,
                optimal: true,
                parent: Some(id),
            });
            let key = tree.node(child).timestep_key();
            if !tree.was_expanded(&key) {
                tree.add_to_open(key, child);
            }
        }

        tree.add_to_closed(tree.node(id).timestep_key(), id);
    }

    tree.into_result(false, None, steps)
}

//

#[cfg(test)]
use rand::{prelude::StdRng, SeedableRng};

#[cfg(test)]
use crate::grid::manhattan_distance;
#[cfg(test)]
use crate::path::{assert_path_valid, make_path};
#[cfg(test)]
use crate::safemap::SafeMap;
#[cfg(test)]
use crate::scenario::random_trajectories;
#[cfg(test)]
use crate::sipp::sipp;

#[cfg(test)]
fn open_grid(height: i32, width: i32) -> Grid {
    Grid::from_cells(vec![vec![false; width as usize]; height as usize])
}

#[test]
fn crosses_an_empty_grid_on_the_diagonal() {
    let grid = open_grid(5, 5);
    let table = CATable::new(&[]);
    let result = astar_timesteps(&grid, &table, (0, 0), (4, 4), manhattan_distance);

    assert!(result.found);
    assert_eq!(result.length(), Some(8));
    let (steps, _) = make_path(&result).unwrap();
    assert_eq!(steps.len(), 9);
}

#[test]
fn static_walls_force_the_long_way_round() {
    let grid = Grid::from_map_str("type octile\nheight 3\nwidth 3\nmap\n...\n##.\n...\n").unwrap();
    let table = CATable::new(&[]);
    let result = astar_timesteps(&grid, &table, (2, 0), (0, 0), manhattan_distance);

    assert!(result.found);
    assert_eq!(result.length(), Some(6));
}

#[test]
fn head_on_corridor_swap_exhausts_the_frontier() {
    let grid = open_grid(1, 3);
    let table = CATable::new(&[vec![(0, 2), (0, 1), (0, 0)]]);
    let result = astar_timesteps(&grid, &table, (0, 0), (0, 2), manhattan_distance);
    assert!(!result.found);
}

#[test]
fn waits_in_place_when_the_corridor_is_briefly_held() {
    // (0, 1) is busy until t = 2; the baseline inserts waits to get through
    let trajectories = vec![vec![(0, 1), (0, 1), (0, 2), (0, 3), (0, 3), (0, 2), (0, 3), (0, 2)]];
    let grid = open_grid(1, 4);
    let table = CATable::new(&trajectories);
    let result = astar_timesteps(&grid, &table, (0, 0), (0, 2), manhattan_distance);

    assert!(result.found);
    let (steps, _) = make_path(&result).unwrap();
    assert_path_valid(&trajectories, &steps);
}

#[test]
fn the_two_models_agree_on_single_obstacle_instances() {
    // long looping trajectories keep the settle time far past any optimal
    // plan, where the timestep and interval worlds are identical
    for seed in 0..6_u64 {
        let rng = &mut StdRng::seed_from_u64(0xCAFE ^ seed);
        let grid = open_grid(6, 6);
        let trajectories = random_trajectories(rng, 1, 6, 6, 50);

        let table = CATable::new(&trajectories);
        let map = SafeMap::new(&grid, &trajectories);

        let interval = sipp(&map, (0, 0), (5, 5), manhattan_distance);
        if !interval.found {
            // the obstacle settled on a terminal cell; the timestep model
            // does not extend settling, so the two worlds differ there
            continue;
        }

        let baseline = astar_timesteps(&grid, &table, (0, 0), (5, 5), manhattan_distance);
        assert!(baseline.found, "seed {}", seed);
        assert_eq!(baseline.length(), interval.length(), "seed {}", seed);

        let (steps, _) = make_path(&baseline).unwrap();
        assert_path_valid(&trajectories, &steps);
        let (steps, _) = make_path(&interval).unwrap();
        assert_path_valid(&trajectories, &steps);
    }
}
