use std::path::Path;

use rand::Rng;

use crate::grid::{ParseError, DELTA};

/// An obstacle trajectory: the cell occupied at each timestep from `t = 0`.
/// After the final entry the obstacle is settled and stays there forever.
pub type Trajectory = Vec<(i32, i32)>;

/// A single planning task read from a `.scen` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scenario {
    pub start: (i32, i32),
    pub goal: (i32, i32),
}

impl Scenario {
    /// Parses the first line of a scenario: `start_i start_j goal_i goal_j`.
    pub fn from_scen_str(s: &str) -> Result<Scenario, ParseError> {
        let line = s.lines().next().ok_or(ParseError::Scenario)?;
        let mut fields = line.split_whitespace().map(|v| v.parse::<i32>());
        let mut next = || fields.next().and_then(|v| v.ok()).ok_or(ParseError::Scenario);
        Ok(Scenario { start: (next()?, next()?), goal: (next()?, next()?) })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Scenario, ParseError> {
        Scenario::from_scen_str(&std::fs::read_to_string(path)?)
    }
}

/// Generates `count` looping obstacle trajectories for benchmarking: each is
/// a random cardinal walk of 3 to 12 cells, mirrored into a palindrome so the
/// obstacle shuttles back and forth, repeated for `cycles` rounds. Walks stay
/// inside the grid bounds.
pub fn random_trajectories(rng: &mut impl Rng, count: usize, height: i32, width: i32, cycles: usize) -> Vec<Trajectory> {
    (0..count)
        .map(|_| {
            let len = rng.gen_range(3..13);
            let mut walk: Trajectory = Vec::with_capacity(len);
            walk.push((rng.gen_range(0..height), rng.gen_range(0..width)));

            while walk.len() < len {
                let &(i, j) = walk.last().unwrap();
                let options: Vec<(i32, i32)> = DELTA
                    .iter()
                    .map(|&(di, dj)| (i + di, j + dj))
                    .filter(|&(ni, nj)| 0 <= ni && ni < height && 0 <= nj && nj < width)
                    .collect();
                walk.push(options[rng.gen_range(0..options.len())]);
            }

            // shuttle loop: there and back again, endpoints not doubled
            let mut lap = walk.clone();
            lap.extend(walk[1..len - 1].iter().rev());

            let mut traj = Trajectory::with_capacity(lap.len() * cycles);
            for _ in 0..cycles {
                traj.extend_from_slice(&lap);
            }
            traj
        })
        .collect()
}

//

#[test]
fn scenario_first_line_parses() {
    let scen = Scenario::from_scen_str("0 0 4 4\nleftover lines are ignored\n").unwrap();
    assert_eq!(scen, Scenario { start: (0, 0), goal: (4, 4) });
}

#[test]
fn scenario_with_missing_fields_is_rejected() {
    assert!(Scenario::from_scen_str("0 0 4\n").is_err());
    assert!(Scenario::from_scen_str("").is_err());
}

#[test]
fn generated_trajectories_stay_in_bounds_and_move_cardinally() {
    use rand::{prelude::StdRng, SeedableRng};

    let rng = &mut StdRng::seed_from_u64(7);
    for traj in random_trajectories(rng, 20, 8, 6, 3) {
        assert!(!traj.is_empty());
        for &(i, j) in &traj {
            assert!(0 <= i && i < 8 && 0 <= j && j < 6);
        }
        for pair in traj.windows(2) {
            let d = (pair[1].0 - pair[0].0).abs() + (pair[1].1 - pair[0].1).abs();
            assert!(d <= 1, "obstacle jumped: {:?} -> {:?}", pair[0], pair[1]);
        }
    }
}
