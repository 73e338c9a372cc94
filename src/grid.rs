use std::path::Path;

use pathfinding::prelude::absdiff;
use thiserror::Error;

/// Cardinal move directions, in generation order.
pub(crate) const DELTA: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed map header: missing or bad `{0}` line")]
    Header(&'static str),
    #[error("map row {row} has {found} cells, expected {expected}")]
    Width { row: usize, found: usize, expected: usize },
    #[error("map has {found} rows, expected {expected}")]
    Height { found: usize, expected: usize },
    #[error("malformed scenario: expected `start_i start_j goal_i goal_j`")]
    Scenario,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Static occupancy grid. Cells are either traversable or blocked; dynamic
/// obstacles are layered on top by [`crate::catable::CATable`] and
/// [`crate::safemap::SafeMap`].
#[derive(Debug, Clone)]
pub struct Grid {
    height: i32,
    width: i32,
    cells: Vec<Vec<bool>>, // true = blocked
}

impl Grid {
    /// Builds a grid directly from a blocked-cell matrix.
    pub fn from_cells(cells: Vec<Vec<bool>>) -> Grid {
        let height = cells.len() as i32;
        let width = cells.first().map_or(0, |row| row.len()) as i32;
        Grid { height, width, cells }
    }

    /// Parses the body of a map: `.` is free, `@`/`#`/`T` are blocked.
    /// Any other character is skipped without advancing the column, which
    /// preserves the alignment quirks of legacy map files.
    pub fn from_body(body: &str, width: i32, height: i32) -> Result<Grid, ParseError> {
        let mut cells = Vec::with_capacity(height as usize);
        for line in body.lines() {
            if line.is_empty() {
                continue;
            }
            let mut row = Vec::with_capacity(width as usize);
            for c in line.chars() {
                match c {
                    '.' => row.push(false),
                    '@' | '#' | 'T' => row.push(true),
                    _ => continue,
                }
            }
            if row.len() != width as usize {
                return Err(ParseError::Width { row: cells.len(), found: row.len(), expected: width as usize });
            }
            cells.push(row);
        }
        if cells.len() != height as usize {
            return Err(ParseError::Height { found: cells.len(), expected: height as usize });
        }
        Ok(Grid { height, width, cells })
    }

    /// Parses a full MovingAI-style map: a `type` line, `height N`, `width N`,
    /// a `map` line, then the grid body. The full declared size is read; the
    /// legacy reader's 70-cell clamp is gone.
    pub fn from_map_str(s: &str) -> Result<Grid, ParseError> {
        let mut parts = s.splitn(5, '\n');
        parts.next().ok_or(ParseError::Header("type"))?;
        let height = header_value(parts.next(), "height")?;
        let width = header_value(parts.next(), "width")?;
        match parts.next() {
            Some(l) if l.trim() == "map" => {}
            _ => return Err(ParseError::Header("map")),
        }
        Grid::from_body(parts.next().unwrap_or(""), width, height)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Grid, ParseError> {
        Grid::from_map_str(&std::fs::read_to_string(path)?)
    }

    #[inline]
    pub fn in_bounds(&self, i: i32, j: i32) -> bool {
        (0 <= i && i < self.height) && (0 <= j && j < self.width)
    }

    #[inline]
    pub fn traversable(&self, i: i32, j: i32) -> bool {
        !self.cells[i as usize][j as usize]
    }

    /// Cardinally adjacent, in-bounds, traversable cells.
    pub fn neighbours(&self, i: i32, j: i32) -> Vec<(i32, i32)> {
        let mut out = Vec::with_capacity(4);
        for (di, dj) in DELTA {
            if self.in_bounds(i + di, j + dj) && self.traversable(i + di, j + dj) {
                out.push((i + di, j + dj));
            }
        }
        out
    }

    /// Grid size as `(height, width)`.
    #[inline]
    pub fn size(&self) -> (i32, i32) {
        (self.height, self.width)
    }
}

fn header_value(line: Option<&str>, key: &'static str) -> Result<i32, ParseError> {
    line.and_then(|l| {
        let mut it = l.split_whitespace();
        (it.next() == Some(key)).then(|| it.next()).flatten()
    })
    .and_then(|v| v.parse().ok())
    .ok_or(ParseError::Header(key))
}

/// The canonical admissible, consistent heuristic on 4-connected grids.
#[inline]
pub fn manhattan_distance(i1: i32, j1: i32, i2: i32, j2: i32) -> f64 {
    (absdiff(i1, i2) + absdiff(j1, j2)) as f64
}

//

#[cfg(test)]
const MAP_5X5: &str = "type octile\nheight 5\nwidth 5\nmap\n.....\n..#..\n..#..\n..#..\n.....\n";

#[test]
fn map_header_and_body_parse() {
    let grid = Grid::from_map_str(MAP_5X5).unwrap();
    assert_eq!(grid.size(), (5, 5));
    assert!(grid.traversable(0, 0));
    assert!(!grid.traversable(1, 2));
    assert!(!grid.traversable(3, 2));
}

#[test]
fn map_with_bad_row_width_is_rejected() {
    let res = Grid::from_body("...\n....\n...\n", 3, 3);
    assert!(matches!(res, Err(ParseError::Width { row: 1, found: 4, expected: 3 })));
}

#[test]
fn map_with_missing_rows_is_rejected() {
    let res = Grid::from_body("...\n...\n", 3, 3);
    assert!(matches!(res, Err(ParseError::Height { found: 2, expected: 3 })));
}

#[test]
fn unknown_characters_do_not_advance_the_column() {
    let grid = Grid::from_body(".x.\u{d}\n..\n", 2, 2).unwrap();
    assert!(grid.traversable(0, 0) && grid.traversable(0, 1));
}

#[test]
fn neighbours_respect_bounds_and_obstacles() {
    let grid = Grid::from_map_str(MAP_5X5).unwrap();
    assert_eq!(grid.neighbours(0, 0), vec![(0, 1), (1, 0)]);
    // (1, 1) has the column obstacle to its right
    assert_eq!(grid.neighbours(1, 1), vec![(2, 1), (1, 0), (0, 1)]);
}

#[test]
fn manhattan_distance_is_symmetric() {
    assert_eq!(manhattan_distance(0, 0, 4, 4), 8.0);
    assert_eq!(manhattan_distance(4, 4, 0, 0), 8.0);
    assert_eq!(manhattan_distance(2, 3, 2, 3), 0.0);
}
