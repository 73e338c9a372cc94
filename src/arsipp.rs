use crate::safemap::SafeMap;
use crate::tree::SearchResult;
use crate::wsipp::wsipp;

/// One anytime iteration: the weighted search outcome, the cumulative step
/// count over all iterations so far, and the weight that produced it.
pub struct AnytimeSolution {
    pub result: SearchResult,
    pub steps: usize,
    pub weight: f64,
}

/// Anytime repairing SIPP, naive flavour: re-runs [`wsipp`] from scratch
/// while lowering the weight from `start_w` towards 1 by `step_w`. Pull one
/// solution at a time; the final iteration runs at `w = 1` and is optimal.
pub struct NaiveArsipp<'a, H> {
    map: &'a SafeMap,
    start: (i32, i32),
    goal: (i32, i32),
    heuristic: H,
    weight: f64,
    step_w: f64,
    steps: usize,
    done: bool,
}

/// Creates the anytime iterator. At least one solution is produced for any
/// finite `start_w`.
///
/// Panics if `start_w < 1` or `step_w <= 0`.
pub fn naive_arsipp<H>(
    map: &SafeMap,
    start: (i32, i32),
    goal: (i32, i32),
    start_w: f64,
    step_w: f64,
    heuristic: H,
) -> NaiveArsipp<'_, H>
where
    H: Fn(i32, i32, i32, i32) -> f64 + Copy,
{
    assert!(start_w >= 1.0, "heuristic weight must be >= 1, got {}", start_w);
    assert!(step_w > 0.0, "weight step must be positive, got {}", step_w);

    NaiveArsipp { map, start, goal, heuristic, weight: start_w, step_w, steps: 0, done: false }
}

impl<H> Iterator for NaiveArsipp<'_, H>
where
    H: Fn(i32, i32, i32, i32) -> f64 + Copy,
{
    type Item = AnytimeSolution;

    fn next(&mut self) -> Option<AnytimeSolution> {
        if self.done {
            return None;
        }

        let weight = self.weight;
        let result = wsipp(self.map, self.start, self.goal, weight, self.heuristic);
        self.steps += result.steps;

        if (weight - 1.0).abs() < f64::EPSILON {
            self.done = true;
        } else {
            self.weight = (weight - self.step_w).max(1.0);
        }

        Some(AnytimeSolution { result, steps: self.steps, weight })
    }
}

//

#[cfg(test)]
use crate::grid::{manhattan_distance, Grid};
#[cfg(test)]
use crate::sipp::sipp;

#[cfg(test)]
fn open_grid(height: i32, width: i32) -> Grid {
    Grid::from_cells(vec![vec![false; width as usize]; height as usize])
}

#[test]
fn the_weight_schedule_descends_to_one() {
    let map = SafeMap::new(&open_grid(5, 5), &[]);
    let weights: Vec<f64> =
        naive_arsipp(&map, (0, 0), (4, 4), 3.0, 0.5, manhattan_distance).map(|sol| sol.weight).collect();
    assert_eq!(weights, vec![3.0, 2.5, 2.0, 1.5, 1.0]);
}

#[test]
fn a_start_weight_of_one_yields_exactly_one_solution() {
    let map = SafeMap::new(&open_grid(5, 5), &[]);
    let solutions: Vec<_> = naive_arsipp(&map, (0, 0), (4, 4), 1.0, 0.5, manhattan_distance).collect();
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0].result.length(), Some(8));
}

#[test]
fn an_uneven_step_still_lands_on_one() {
    let map = SafeMap::new(&open_grid(4, 4), &[]);
    let weights: Vec<f64> =
        naive_arsipp(&map, (0, 0), (3, 3), 2.0, 0.75, manhattan_distance).map(|sol| sol.weight).collect();
    assert_eq!(weights, vec![2.0, 1.25, 1.0]);
}

#[test]
#[should_panic(expected = "heuristic weight must be >= 1")]
fn start_weights_below_one_are_rejected() {
    let map = SafeMap::new(&open_grid(3, 3), &[]);
    naive_arsipp(&map, (0, 0), (2, 2), 0.5, 0.5, manhattan_distance);
}

#[test]
fn solutions_never_get_worse_and_end_at_the_optimum() {
    // two small shuttles parked far away from the start-goal staircase
    let trajectories = vec![vec![(1, 8), (0, 8)], vec![(2, 7), (2, 8), (2, 7)]];
    let map = SafeMap::new(&open_grid(10, 10), &trajectories);

    let optimum = sipp(&map, (0, 0), (9, 9), manhattan_distance).length().unwrap();

    let mut previous = None;
    let mut last = None;
    let mut cumulative = 0;
    for sol in naive_arsipp(&map, (0, 0), (9, 9), 3.0, 0.5, manhattan_distance) {
        assert!(sol.result.found);
        let len = sol.result.length().unwrap();
        if let Some(prev) = previous {
            assert!(len <= prev, "solution got worse: {} after {}", len, prev);
        }
        assert!(sol.steps >= cumulative);
        cumulative = sol.steps;
        previous = Some(len);
        last = Some(len);
    }
    assert_eq!(last, Some(optimum));
}
