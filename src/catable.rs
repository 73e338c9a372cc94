use crate::{scenario::Trajectory, FxIndexMap, Time};

/// Collision avoidance table: a dense `(cell, time) -> obstacle id` lookup
/// over every position appearing in any obstacle trajectory. This is the
/// timestep model used by the baseline search; the interval model lives in
/// [`crate::safemap::SafeMap`].
pub struct CATable {
    pos_time: FxIndexMap<(i32, i32, Time), u32>,
}

impl CATable {
    pub fn new(trajectories: &[Trajectory]) -> CATable {
        let mut pos_time = FxIndexMap::default();
        for (obst_id, traj) in trajectories.iter().enumerate() {
            for (t, &(i, j)) in traj.iter().enumerate() {
                pos_time.insert((i, j, t as Time), obst_id as u32);
            }
        }
        tracing::debug!(obstacles = trajectories.len(), entries = pos_time.len(), "built collision avoidance table");
        CATable { pos_time }
    }

    /// True iff no obstacle occupies `(i, j)` at time `t`.
    #[inline]
    pub fn cell_free(&self, i: i32, j: i32, t: Time) -> bool {
        !self.pos_time.contains_key(&(i, j, t))
    }

    /// A move from `(i1, j1)` at `t` into `(i2, j2)` at `t + 1` is valid iff
    /// the target cell is free on arrival and no obstacle crosses the same
    /// edge the other way across the step. Waiting (`i1 == i2`, `j1 == j2`)
    /// only needs the cell to stay free at `t + 1`.
    pub fn move_valid(&self, i1: i32, j1: i32, i2: i32, j2: i32, t: Time) -> bool {
        let swapped = !self.cell_free(i2, j2, t) && !self.cell_free(i1, j1, t + 1);
        !swapped && self.cell_free(i2, j2, t + 1)
    }
}

//

#[test]
fn occupied_cells_are_tracked_per_timestep() {
    let table = CATable::new(&[vec![(0, 2), (0, 1), (0, 0)]]);

    assert!(!table.cell_free(0, 2, 0));
    assert!(!table.cell_free(0, 1, 1));
    assert!(!table.cell_free(0, 0, 2));

    assert!(table.cell_free(0, 2, 1));
    assert!(table.cell_free(0, 1, 0));
    // the timestep model does not extend a settled obstacle past its trajectory
    assert!(table.cell_free(0, 0, 3));
}

#[test]
fn vertex_collisions_are_rejected() {
    let table = CATable::new(&[vec![(0, 2), (0, 1), (0, 0)]]);

    // moving into (0, 1) arriving at t = 1 lands on the obstacle
    assert!(!table.move_valid(0, 0, 0, 1, 0));
    // waiting in place is fine while the cell stays free
    assert!(table.move_valid(0, 0, 0, 0, 0));
    // but not when the obstacle arrives next step
    assert!(!table.move_valid(0, 0, 0, 0, 1));
}

#[test]
fn edge_collisions_are_rejected() {
    let table = CATable::new(&[vec![(0, 2), (0, 1), (0, 0)]]);

    // head-on swap across t = 1 -> 2: obstacle goes (0,1) -> (0,0) while the
    // agent tries (0,0) -> (0,1)
    assert!(!table.move_valid(0, 0, 0, 1, 1));
    // the same move is fine once the obstacle has passed
    assert!(table.move_valid(0, 0, 0, 1, 2));
}
