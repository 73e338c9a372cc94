use crate::tree::{Node, SearchResult};
use crate::Time;

/// One cell of a reconstructed plan, indexed by timestep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathStep {
    pub i: i32,
    pub j: i32,
    pub g: Time,
}

/// Unwinds the goal's parent chain and densifies it to one step per
/// timestep: whenever a parent and child are more than one step apart, the
/// agent waited in the parent's cell, and explicit wait steps are synthesized
/// there. The result has `goal.g + 1` steps; the returned length is `goal.g`.
///
/// Returns `None` when the search found no path.
pub fn make_path(result: &SearchResult) -> Option<(Vec<PathStep>, Time)> {
    let goal = result.goal?;

    let mut chain: Vec<&Node> = itertools::unfold(Some(goal), |id| {
        id.map(|cur| {
            let node = result.node(cur);
            *id = node.parent;
            node
        })
    })
    .collect();
    chain.reverse();

    let length = chain.last().map_or(0, |n| n.g);
    let mut steps = Vec::with_capacity(length as usize + 1);
    for pair in chain.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        // hold the departure cell until one step before arrival
        for g in from.g..to.g {
            steps.push(PathStep { i: from.i, j: from.j, g });
        }
    }
    let last = chain.last().expect("goal id outside the node arena");
    steps.push(PathStep { i: last.i, j: last.j, g: last.g });

    Some((steps, length))
}

/// Test support: checks a densified plan against the obstacle trajectories
/// for vertex collisions, edge collisions, and illegal jumps.
#[cfg(test)]
pub(crate) fn assert_path_valid(trajectories: &[crate::scenario::Trajectory], steps: &[PathStep]) {
    let at = |traj: &crate::scenario::Trajectory, t: Time| traj[t.min(traj.len() as Time - 1) as usize];

    for step in steps {
        for traj in trajectories {
            assert_ne!(at(traj, step.g), (step.i, step.j), "vertex collision at {:?}", step);
        }
    }
    for pair in steps.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        assert!((b.i - a.i).abs() + (b.j - a.j).abs() <= 1, "illegal move {:?} -> {:?}", a, b);
        for traj in trajectories {
            let swapped = at(traj, a.g) == (b.i, b.j) && at(traj, b.g) == (a.i, a.j);
            assert!(!swapped, "edge collision {:?} -> {:?}", a, b);
        }
    }
}

//

#[cfg(test)]
use crate::Cost;

#[cfg(test)]
fn result_with_chain(chain: &[(i32, i32, Time)]) -> SearchResult {
    let nodes: Vec<Node> = chain
        .iter()
        .enumerate()
        .map(|(idx, &(i, j, g))| Node {
            i,
            j,
            g,
            h: 0.0,
            f: Cost::from(g as f64),
            interval: 0,
            optimal: true,
            parent: idx.checked_sub(1),
        })
        .collect();
    SearchResult {
        found: true,
        goal: Some(nodes.len() - 1),
        steps: 0,
        nodes_created: nodes.len(),
        reexpanded: 0,
        open: vec![],
        closed: vec![],
        nodes,
    }
}

#[test]
fn waits_are_synthesized_in_the_departure_cell() {
    // arrive (0, 1) at t = 1, wait there until moving at t = 3 -> 4
    let result = result_with_chain(&[(0, 0, 0), (0, 1, 1), (1, 1, 4), (1, 2, 5)]);
    let (steps, length) = make_path(&result).unwrap();

    assert_eq!(length, 5);
    assert_eq!(
        steps,
        vec![
            PathStep { i: 0, j: 0, g: 0 },
            PathStep { i: 0, j: 1, g: 1 },
            PathStep { i: 0, j: 1, g: 2 },
            PathStep { i: 0, j: 1, g: 3 },
            PathStep { i: 1, j: 1, g: 4 },
            PathStep { i: 1, j: 2, g: 5 },
        ]
    );
}

#[test]
fn waiting_at_the_start_is_densified_too() {
    let result = result_with_chain(&[(0, 0, 0), (0, 1, 3)]);
    let (steps, length) = make_path(&result).unwrap();

    assert_eq!(length, 3);
    assert_eq!(steps.len(), 4);
    assert_eq!(&steps[..3], &[
        PathStep { i: 0, j: 0, g: 0 },
        PathStep { i: 0, j: 0, g: 1 },
        PathStep { i: 0, j: 0, g: 2 },
    ]);
}

#[test]
fn dense_paths_tick_by_exactly_one() {
    let result = result_with_chain(&[(0, 0, 0), (1, 0, 1), (1, 1, 2), (2, 1, 6)]);
    let (steps, length) = make_path(&result).unwrap();

    assert_eq!(steps.len() as Time, length + 1);
    for pair in steps.windows(2) {
        assert_eq!(pair[1].g - pair[0].g, 1);
        let moved = (pair[1].i - pair[0].i).abs() + (pair[1].j - pair[0].j).abs();
        assert!(moved <= 1);
    }
}

#[test]
fn a_trivial_search_yields_a_single_step() {
    let result = result_with_chain(&[(2, 3, 0)]);
    let (steps, length) = make_path(&result).unwrap();
    assert_eq!(length, 0);
    assert_eq!(steps, vec![PathStep { i: 2, j: 3, g: 0 }]);
}

#[test]
fn an_unsuccessful_search_has_no_path() {
    let mut result = result_with_chain(&[(0, 0, 0)]);
    result.found = false;
    result.goal = None;
    assert!(make_path(&result).is_none());
}
