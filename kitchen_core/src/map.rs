use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::Position;

/// Represents errors that can occur within the grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Coordinates ({x}, {y}) are out of bounds for grid size ({width}, {height})")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
    #[error("Row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown cell code {code} at ({x}, {y})")]
    UnknownCode { code: u8, x: usize, y: usize },
}

/// A generic 2D grid structure.
///
/// Stores elements of type `T` in a flat vector using row-major order and is
/// addressed by [`Position`] (`x` is the column, `y` the row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a new grid with the specified dimensions, filled with default values.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    pub fn new(width: usize, height: usize) -> Self
    where
        T: Default + Clone,
    {
        let size = width.checked_mul(height).expect("Grid size overflow");
        Grid {
            width,
            height,
            cells: vec![T::default(); size],
        }
    }

    /// Creates a new grid with the specified dimensions, filled by a generator function.
    ///
    /// The generator function `f` receives each cell's position in row-major order.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    pub fn from_generator<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(Position) -> T,
    {
        let size = width.checked_mul(height).expect("Grid size overflow");
        let mut cells = Vec::with_capacity(size);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(Position { x, y }));
            }
        }
        Grid {
            width,
            height,
            cells,
        }
    }

    /// Returns the width of the grid.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height of the grid.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index_of(&self, pos: Position) -> Option<usize> {
        self.contains(pos).then(|| pos.y * self.width + pos.x)
    }

    /// Checks if the given position is within the grid boundaries.
    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// Gets an immutable reference to the cell at the given position.
    ///
    /// Returns `None` if the position is out of bounds.
    pub fn get(&self, pos: Position) -> Option<&T> {
        self.index_of(pos).and_then(|index| self.cells.get(index))
    }

    /// Gets a mutable reference to the cell at the given position.
    ///
    /// Returns `None` if the position is out of bounds.
    pub fn get_mut(&mut self, pos: Position) -> Option<&mut T> {
        let index = self.index_of(pos)?;
        self.cells.get_mut(index)
    }

    /// Sets the value of the cell at the given position.
    pub fn set(&mut self, pos: Position, value: T) -> Result<(), GridError> {
        let index = self.index_of(pos).ok_or(GridError::OutOfBounds {
            x: pos.x,
            y: pos.y,
            width: self.width,
            height: self.height,
        })?;
        self.cells[index] = value;
        Ok(())
    }

    /// Returns an iterator over the cells of the grid in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }

    /// Returns an iterator that yields `(Position, &T)` for each cell.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &T)> {
        let width = self.width;
        self.cells.iter().enumerate().map(move |(index, cell)| {
            let pos = Position {
                x: index % width,
                y: index / width,
            };
            (pos, cell)
        })
    }

    /// Maps every cell into a new grid of the same shape.
    pub fn map<U, F>(&self, f: F) -> Grid<U>
    where
        F: FnMut(&T) -> U,
    {
        Grid {
            width: self.width,
            height: self.height,
            cells: self.cells.iter().map(f).collect(),
        }
    }
}

/// Indexing using Position coordinates for access
impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: Position) -> &Self::Output {
        match self.index_of(index) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                index, self.width, self.height
            ),
        }
    }
}

/// Indexing using Position coordinates for mutable access
impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, index: Position) -> &mut Self::Output {
        let (width, height) = (self.width, self.height);
        match self.index_of(index) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                index, width, height
            ),
        }
    }
}

/// Walkability of a cell as seen by the pathfinder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Terrain {
    #[default]
    Floor,
    Wall,
}

impl Terrain {
    /// Decodes the `0`/`1` cell code used by level definitions.
    pub fn from_code(code: u8) -> Option<Terrain> {
        match code {
            0 => Some(Terrain::Floor),
            1 => Some(Terrain::Wall),
            _ => None,
        }
    }

    #[inline]
    pub fn is_walkable(self) -> bool {
        self == Terrain::Floor
    }
}

impl Grid<Terrain> {
    /// Builds a terrain grid from rows of `0`/`1` codes, `rows[y][x]`.
    pub fn from_codes<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self, GridError> {
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.as_ref().len());
        let mut cells = Vec::with_capacity(width * height);
        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != width {
                return Err(GridError::RaggedRow {
                    row: y,
                    expected: width,
                    found: row.len(),
                });
            }
            for (x, &code) in row.iter().enumerate() {
                cells.push(Terrain::from_code(code).ok_or(GridError::UnknownCode { code, x, y })?);
            }
        }
        Ok(Grid {
            width,
            height,
            cells,
        })
    }

    /// Returns true if `pos` is inside the grid and walkable.
    pub fn is_walkable(&self, pos: Position) -> bool {
        self.get(pos).is_some_and(|terrain| terrain.is_walkable())
    }

    /// Returns a working copy with `destination` marked walkable, so a path can end on it.
    ///
    /// Out-of-bounds destinations leave the copy unchanged.
    pub fn carved(&self, destination: Position) -> Grid<Terrain> {
        let mut copy = self.clone();
        if let Some(cell) = copy.get_mut(destination) {
            *cell = Terrain::Floor;
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_codes_reads_rows_as_y() {
        let grid = Grid::from_codes(&[[1u8, 1, 1], [1, 0, 0]]).unwrap();
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid[Position::new(2, 1)], Terrain::Floor);
        assert_eq!(grid[Position::new(0, 1)], Terrain::Wall);
    }

    #[test]
    fn from_codes_rejects_ragged_rows() {
        let rows: Vec<Vec<u8>> = vec![vec![0, 0], vec![0]];
        assert_eq!(
            Grid::from_codes(&rows),
            Err(GridError::RaggedRow {
                row: 1,
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn from_codes_rejects_unknown_code() {
        let err = Grid::from_codes(&[[0u8, 7]]).unwrap_err();
        assert_eq!(err, GridError::UnknownCode { code: 7, x: 1, y: 0 });
    }

    #[test]
    fn carved_copy_leaves_source_untouched() {
        let grid = Grid::from_codes(&[[1u8, 1], [1, 0]]).unwrap();
        let carved = grid.carved(Position::new(0, 0));
        assert!(carved.is_walkable(Position::new(0, 0)));
        assert!(!grid.is_walkable(Position::new(0, 0)));
        assert_eq!(grid.carved(Position::new(9, 9)), grid);
    }

    #[test]
    fn set_out_of_bounds_errors() {
        let mut grid: Grid<Terrain> = Grid::new(2, 2);
        assert!(matches!(
            grid.set(Position::new(2, 0), Terrain::Wall),
            Err(GridError::OutOfBounds { x: 2, .. })
        ));
        grid.set(Position::new(1, 1), Terrain::Wall).unwrap();
        assert_eq!(grid.iter().filter(|t| **t == Terrain::Wall).count(), 1);
    }

    #[test]
    fn enumerate_yields_row_major_positions() {
        let grid = Grid::from_generator(2, 2, |pos| pos.x + 10 * pos.y);
        let cells: Vec<_> = grid.enumerate().map(|(pos, v)| (pos, *v)).collect();
        assert_eq!(cells[1], (Position::new(1, 0), 1));
        assert_eq!(cells[2], (Position::new(0, 1), 10));
    }
}
