use crate::grid::{Grid, DELTA};
use crate::scenario::Trajectory;
use crate::{FxIndexMap, Time, TIME_INF};

/// A maximal window of obstacle-free time at one cell. The window is open on
/// both sides: the cell is free for every integer `t` with `lo < t < hi`.
/// `blocked_exits` holds the directions obstacles took when leaving this cell
/// at `lo + 1`; an agent entering at that instant from the opposite direction
/// would swap places with the obstacle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeInterval {
    pub lo: Time,
    pub hi: Time,
    pub blocked_exits: Vec<(i32, i32)>,
}

impl SafeInterval {
    #[inline]
    pub fn contains(&self, t: Time) -> bool {
        self.lo < t && t < self.hi
    }
}

/// The safe-interval decomposition of the space-time grid: per traversable
/// cell, a sorted list of disjoint [`SafeInterval`]s. Immutable once built.
///
/// - A cell no obstacle ever visits has the single interval `(-1, inf)`.
/// - A cell some obstacle settles on has a finite final interval; from the
///   earliest settle time onward the cell has no intervals at all.
pub struct SafeMap {
    height: i32,
    width: i32,
    intervals: Vec<Vec<Vec<SafeInterval>>>,
}

impl SafeMap {
    pub fn new(grid: &Grid, trajectories: &[Trajectory]) -> SafeMap {
        // For every visited cell, the occupancy instants together with the
        // displacement the obstacle takes out of the cell on the next step.
        let mut pos_time: FxIndexMap<(i32, i32), Vec<(Time, i32, i32)>> = FxIndexMap::default();
        let mut settle_time: FxIndexMap<(i32, i32), Time> = FxIndexMap::default();

        for traj in trajectories {
            for (t, &(i, j)) in traj.iter().enumerate() {
                let (d_i, d_j) = match traj.get(t + 1) {
                    Some(&(ni, nj)) => (ni - i, nj - j),
                    None => (0, 0),
                };
                pos_time.entry((i, j)).or_insert_with(Vec::new).push((t as Time, d_i, d_j));
            }
            if let Some(&last) = traj.last() {
                let settled_at = (traj.len() - 1) as Time;
                // earliest settler wins if several obstacles end on one cell
                match settle_time.get_mut(&last) {
                    Some(t) => *t = (*t).min(settled_at),
                    None => {
                        settle_time.insert(last, settled_at);
                    }
                }
            }
        }

        let (height, width) = grid.size();
        let mut intervals = vec![vec![Vec::new(); width as usize]; height as usize];

        for i in 0..height {
            for j in 0..width {
                if !grid.traversable(i, j) {
                    continue;
                }
                let slot: &mut Vec<SafeInterval> = &mut intervals[i as usize][j as usize];
                let Some(entries) = pos_time.get_mut(&(i, j)) else {
                    slot.push(SafeInterval { lo: -1, hi: TIME_INF, blocked_exits: Vec::new() });
                    continue;
                };
                entries.sort_unstable();

                let settled = settle_time.get(&(i, j)).copied();
                let mut old_t: Time = -1;
                let mut exits: Vec<(i32, i32)> = Vec::new();

                for &(t, d_i, d_j) in entries.iter() {
                    if matches!(settled, Some(s) if t > s) {
                        break;
                    }
                    if t - old_t > 1 {
                        slot.push(SafeInterval { lo: old_t, hi: t, blocked_exits: std::mem::take(&mut exits) });
                    }
                    if t != old_t {
                        exits.clear();
                    }
                    if (d_i != 0 || d_j != 0) && !exits.contains(&(d_i, d_j)) {
                        exits.push((d_i, d_j));
                    }
                    old_t = t;
                }

                if settled.is_none() {
                    slot.push(SafeInterval { lo: old_t, hi: TIME_INF, blocked_exits: exits });
                }
            }
        }

        let total: usize = intervals.iter().flatten().map(Vec::len).sum();
        tracing::debug!(height, width, obstacles = trajectories.len(), intervals = total, "built safe-interval map");

        SafeMap { height, width, intervals }
    }

    #[inline]
    pub fn in_bounds(&self, i: i32, j: i32) -> bool {
        (0 <= i && i < self.height) && (0 <= j && j < self.width)
    }

    /// Grid size as `(height, width)`.
    #[inline]
    pub fn size(&self) -> (i32, i32) {
        (self.height, self.width)
    }

    /// Index of the candidate interval at `(i, j)` for time `t`: the first
    /// interval whose upper end lies beyond `t`. `None` if the query is out
    /// of bounds or the cell has no interval past `t`. The candidate does not
    /// necessarily contain `t`; callers check strict containment.
    pub fn get_interval(&self, i: i32, j: i32, t: Time) -> Option<usize> {
        if !self.in_bounds(i, j) {
            return None;
        }
        let ivs = &self.intervals[i as usize][j as usize];
        let idx = ivs.partition_point(|iv| iv.hi <= t);
        (idx < ivs.len()).then_some(idx)
    }

    #[inline]
    pub fn interval(&self, i: i32, j: i32, idx: usize) -> &SafeInterval {
        &self.intervals[i as usize][j as usize][idx]
    }

    #[inline]
    pub fn interval_count(&self, i: i32, j: i32) -> usize {
        self.intervals[i as usize][j as usize].len()
    }

    /// True iff `(i, j)` is obstacle-free at time `t`.
    pub fn traversable(&self, i: i32, j: i32, t: Time) -> bool {
        self.get_interval(i, j, t)
            .map_or(false, |idx| self.intervals[i as usize][j as usize][idx].contains(t))
    }

    /// Earliest-arrival transitions out of `(i, j)` at time `t`: for every
    /// cardinal neighbour and every safe interval of that neighbour reachable
    /// before the current interval closes, the earliest time the agent can
    /// arrive there (waiting in place first if needed).
    ///
    /// Panics if `(i, j, t)` lies inside no safe interval; expanding such a
    /// state is a programmer error.
    pub fn neighbours(&self, i: i32, j: i32, t: Time) -> Vec<(i32, i32, Time)> {
        let current = self
            .get_interval(i, j, t)
            .map(|idx| &self.intervals[i as usize][j as usize][idx])
            .filter(|iv| iv.contains(t))
            .unwrap_or_else(|| panic!("expansion outside any safe interval: ({}, {}) at t = {}", i, j, t));

        let depart = t + 1;
        // last instant the agent may still occupy (i, j)
        let f = current.hi;

        let mut out = Vec::new();
        for (di, dj) in DELTA {
            let (ni, nj) = (i + di, j + dj);
            if !self.in_bounds(ni, nj) {
                continue;
            }
            let Some(first) = self.get_interval(ni, nj, depart) else { continue };
            let ivs = &self.intervals[ni as usize][nj as usize];
            let last = self.get_interval(ni, nj, f).unwrap_or(ivs.len() - 1);

            for iv in &ivs[first..=last] {
                let mut t_in = depart.max(iv.lo + 1);
                // leaving at the closing instant into a cell freed that same
                // instant: refuse the head-on swap and wait one more step
                if t_in == iv.lo + 1 && t_in == f && iv.blocked_exits.contains(&(-di, -dj)) {
                    t_in += 1;
                }
                if t_in > f || t_in >= iv.hi {
                    continue;
                }
                out.push((ni, nj, t_in));
            }
        }
        out
    }
}

//

#[cfg(test)]
use rand::{prelude::StdRng, Rng, SeedableRng};

#[cfg(test)]
fn open_grid(height: i32, width: i32) -> Grid {
    Grid::from_cells(vec![vec![false; width as usize]; height as usize])
}

/// Settle-aware occupancy straight from the trajectories.
#[cfg(test)]
fn occupied(trajectories: &[Trajectory], i: i32, j: i32, t: Time) -> bool {
    trajectories.iter().any(|traj| {
        let idx = t.min(traj.len() as Time - 1) as usize;
        traj[idx] == (i, j)
    })
}

#[test]
fn unvisited_cell_has_one_unbounded_interval() {
    let map = SafeMap::new(&open_grid(3, 3), &[vec![(0, 0), (0, 1)]]);
    assert_eq!(map.interval_count(2, 2), 1);
    assert_eq!(map.interval(2, 2, 0), &SafeInterval { lo: -1, hi: TIME_INF, blocked_exits: vec![] });
}

#[test]
fn transient_visit_splits_the_timeline() {
    // obstacle crosses (2, 2) at t = 2 on its way down the column
    let map = SafeMap::new(&open_grid(5, 5), &[vec![(0, 2), (1, 2), (2, 2), (3, 2), (4, 2)]]);

    assert_eq!(map.interval_count(2, 2), 2);
    assert_eq!(map.interval(2, 2, 0), &SafeInterval { lo: -1, hi: 2, blocked_exits: vec![] });
    assert_eq!(map.interval(2, 2, 1), &SafeInterval { lo: 2, hi: TIME_INF, blocked_exits: vec![(1, 0)] });

    assert!(map.traversable(2, 2, 1));
    assert!(!map.traversable(2, 2, 2));
    assert!(map.traversable(2, 2, 3));
}

#[test]
fn settled_cell_loses_its_tail() {
    let map = SafeMap::new(&open_grid(5, 5), &[vec![(0, 2), (1, 2), (2, 2), (3, 2), (4, 2)]]);

    // the obstacle parks on (4, 2) at t = 4 and never leaves
    assert_eq!(map.interval_count(4, 2), 1);
    assert_eq!(map.interval(4, 2, 0), &SafeInterval { lo: -1, hi: 4, blocked_exits: vec![] });
    assert!(map.traversable(4, 2, 3));
    assert!(!map.traversable(4, 2, 4));
    assert!(!map.traversable(4, 2, 1000));
}

#[test]
fn cell_held_from_the_start_has_no_intervals() {
    let map = SafeMap::new(&open_grid(3, 3), &[vec![(2, 2)]]);
    assert_eq!(map.interval_count(2, 2), 0);
    assert_eq!(map.get_interval(2, 2, 0), None);
    assert!(!map.traversable(2, 2, 0));
}

#[test]
fn get_interval_is_a_sentinel_out_of_bounds() {
    let map = SafeMap::new(&open_grid(3, 3), &[]);
    assert_eq!(map.get_interval(-1, 0, 0), None);
    assert_eq!(map.get_interval(0, 3, 5), None);
}

#[test]
fn neighbours_on_an_open_grid_arrive_next_step() {
    let map = SafeMap::new(&open_grid(5, 5), &[]);
    let mut out = map.neighbours(2, 2, 0);
    out.sort_unstable();
    assert_eq!(out, vec![(1, 2, 1), (2, 1, 1), (2, 3, 1), (3, 2, 1)]);
}

#[test]
fn neighbours_wait_out_a_passing_obstacle() {
    // obstacle holds (0, 1) during t = 1..=2; the agent expanding (0, 0) at
    // t = 0 can only enter once it has passed
    let map = SafeMap::new(&open_grid(1, 4), &[vec![(0, 1), (0, 1), (0, 2), (0, 3)]]);
    let out = map.neighbours(0, 0, 0);
    assert_eq!(out, vec![(0, 1, 2)]);
}

#[test]
fn head_on_swap_is_refused() {
    // corridor swap: the obstacle walks (0,2) -> (0,1) -> (0,0) while the
    // agent sits at (0, 0); every way forward is an edge or vertex collision
    let map = SafeMap::new(&open_grid(1, 3), &[vec![(0, 2), (0, 1), (0, 0)]]);
    assert!(map.traversable(0, 0, 0));
    assert_eq!(map.neighbours(0, 0, 0), vec![]);
}

#[test]
fn boundary_moves_are_legal_when_the_obstacle_turns_away() {
    // the agent's cell is invaded at t = 2, and (0, 0) frees up at exactly
    // that instant with its occupant turning off sideways: no swap, so the
    // boundary move is allowed, while the matching move into (1, 1) would
    // swap with the obstacle coming up and is refused
    let trajectories = vec![vec![(1, 1), (1, 1), (0, 1)], vec![(0, 0), (0, 0), (1, 0)]];
    let map = SafeMap::new(&open_grid(2, 2), &trajectories);
    assert_eq!(map.neighbours(0, 1, 0), vec![(0, 0, 2)]);
}

#[test]
#[should_panic(expected = "expansion outside any safe interval")]
fn expanding_an_occupied_state_panics() {
    let map = SafeMap::new(&open_grid(3, 3), &[vec![(1, 1), (1, 1)]]);
    map.neighbours(1, 1, 0);
}

#[test]
fn intervals_partition_exactly_the_free_times() {
    let rng = &mut StdRng::seed_from_u64(0xA5A5);
    for _ in 0..10 {
        let (height, width) = (8, 8);
        let mut cells = vec![vec![false; width as usize]; height as usize];
        for row in cells.iter_mut() {
            for cell in row.iter_mut() {
                *cell = rng.gen_bool(0.15);
            }
        }
        let grid = Grid::from_cells(cells);
        let trajectories = crate::scenario::random_trajectories(rng, 5, height, width, 2);
        let map = SafeMap::new(&grid, &trajectories);

        let horizon = trajectories.iter().map(Vec::len).max().unwrap() as Time + 3;
        for i in 0..height {
            for j in 0..width {
                if !grid.traversable(i, j) {
                    continue;
                }
                // free times and interval membership agree at every instant
                for t in 0..horizon {
                    assert_eq!(
                        map.traversable(i, j, t),
                        !occupied(&trajectories, i, j, t),
                        "mismatch at ({}, {}) t = {}",
                        i,
                        j,
                        t
                    );
                }
                // intervals are disjoint and sorted
                for k in 1..map.interval_count(i, j) {
                    assert!(map.interval(i, j, k - 1).hi <= map.interval(i, j, k).lo);
                }
            }
        }
    }
}

#[test]
fn emitted_neighbours_are_always_traversable() {
    let rng = &mut StdRng::seed_from_u64(0x5EED);
    let (height, width) = (8, 8);
    let grid = open_grid(height, width);
    let trajectories = crate::scenario::random_trajectories(rng, 6, height, width, 2);
    let map = SafeMap::new(&grid, &trajectories);

    let horizon = trajectories.iter().map(Vec::len).max().unwrap() as Time + 3;
    for i in 0..height {
        for j in 0..width {
            for t in 0..horizon {
                if !map.traversable(i, j, t) {
                    continue;
                }
                for (ni, nj, nt) in map.neighbours(i, j, t) {
                    assert!(map.traversable(ni, nj, nt), "({}, {}, {}) -> ({}, {}, {})", i, j, t, ni, nj, nt);
                    assert!(nt > t);
                }
            }
        }
    }
}
