use crate::{PlayerId, Pos, BOARD_SIZE};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellState {
    #[default]
    Empty,
    Head(PlayerId),
    Trail(PlayerId),
    Dead(PlayerId),
}

impl CellState {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellState::Empty)
    }

    pub fn owner(&self) -> Option<PlayerId> {
        match self {
            CellState::Empty => None,
            CellState::Head(id) | CellState::Trail(id) | CellState::Dead(id) => Some(*id),
        }
    }

    pub fn is_owned_by(&self, id: PlayerId) -> bool {
        self.owner() == Some(id)
    }
}

impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellState::Empty => write!(f, "__"),
            CellState::Head(id) => write!(f, "p{}", id.slot()),
            CellState::Trail(id) => write!(f, "t{}", id.slot()),
            CellState::Dead(id) => write!(f, "d{}", id.slot()),
        }
    }
}

/// Grid of cell labels, indexed `[y][x]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Board {
    cells: [[CellState; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Off-board positions read as empty.
    pub fn get(&self, pos: Pos) -> CellState {
        if pos.in_bounds() {
            self.cells[pos.y as usize][pos.x as usize]
        } else {
            CellState::Empty
        }
    }

    /// Writes outside the board are ignored.
    pub fn set(&mut self, pos: Pos, cell: CellState) {
        if pos.in_bounds() {
            self.cells[pos.y as usize][pos.x as usize] = cell;
        }
    }

    pub fn is_free(&self, pos: Pos) -> bool {
        pos.in_bounds() && self.get(pos).is_empty()
    }

    /// Clears `pos` only if it currently belongs to `id`.
    pub fn clear_if_owned(&mut self, pos: Pos, id: PlayerId) {
        if self.get(pos).is_owned_by(id) {
            self.set(pos, CellState::Empty);
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[CellState; BOARD_SIZE]> {
        self.cells.iter()
    }

    pub fn occupied(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| !cell.is_empty())
            .count()
    }

    /// Most-recent-first positions of `id`: the head at `head`, then the
    /// contiguous `Trail(id)` cells reachable from it, at most `depth` in all.
    pub fn trail_from(&self, head: Pos, id: PlayerId, depth: usize) -> Vec<Pos> {
        let mut history = Vec::with_capacity(depth);
        if depth == 0 {
            return history;
        }
        history.push(head);

        let mut current = head;
        while history.len() < depth {
            let next = current.neighbors().find(|candidate| {
                self.get(*candidate) == CellState::Trail(id) && !history.contains(candidate)
            });
            match next {
                Some(pos) => {
                    history.push(pos);
                    current = pos;
                }
                None => break,
            }
        }

        history
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  ")?;
        for x in 0..BOARD_SIZE {
            write!(f, "{:3}", x)?;
        }
        writeln!(f)?;
        for (y, row) in self.rows().enumerate() {
            write!(f, "{:2} ", y)?;
            for cell in row {
                write!(f, "{} ", cell)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P1: PlayerId = PlayerId(1);
    const P2: PlayerId = PlayerId(2);

    #[test]
    fn test_new_board_is_empty() {
        let board = Board::new();
        assert_eq!(board.occupied(), 0);
        assert!(board.is_free(Pos::new(0, 0)));
    }

    #[test]
    fn test_set_and_get() {
        let mut board = Board::new();
        board.set(Pos::new(3, 7), CellState::Head(P1));
        assert_eq!(board.get(Pos::new(3, 7)), CellState::Head(P1));
        assert_eq!(board.get(Pos::new(7, 3)), CellState::Empty);
        assert!(!board.is_free(Pos::new(3, 7)));
    }

    #[test]
    fn test_off_board_access() {
        let mut board = Board::new();
        board.set(Pos::new(-1, 0), CellState::Trail(P1));
        board.set(Pos::new(0, BOARD_SIZE as i32), CellState::Trail(P1));
        assert_eq!(board.occupied(), 0);
        assert!(!board.is_free(Pos::new(-1, 0)));
    }

    #[test]
    fn test_clear_if_owned_respects_owner() {
        let mut board = Board::new();
        board.set(Pos::new(1, 1), CellState::Trail(P1));
        board.set(Pos::new(2, 1), CellState::Trail(P2));

        board.clear_if_owned(Pos::new(1, 1), P1);
        board.clear_if_owned(Pos::new(2, 1), P1);

        assert_eq!(board.get(Pos::new(1, 1)), CellState::Empty);
        assert_eq!(board.get(Pos::new(2, 1)), CellState::Trail(P2));
    }

    #[test]
    fn test_trail_walk_follows_own_cells() {
        let mut board = Board::new();
        // p1 came down column 2 then turned right along row 4.
        for y in 1..4 {
            board.set(Pos::new(2, y), CellState::Trail(P1));
        }
        board.set(Pos::new(2, 4), CellState::Trail(P1));
        board.set(Pos::new(3, 4), CellState::Trail(P1));
        board.set(Pos::new(4, 4), CellState::Head(P1));
        // Another player's trail next to the head must be ignored.
        board.set(Pos::new(4, 5), CellState::Trail(P2));

        let history = board.trail_from(Pos::new(4, 4), P1, 7);
        assert_eq!(
            history,
            vec![
                Pos::new(4, 4),
                Pos::new(3, 4),
                Pos::new(2, 4),
                Pos::new(2, 3),
                Pos::new(2, 2),
                Pos::new(2, 1),
            ]
        );
    }

    #[test]
    fn test_trail_walk_is_bounded() {
        let mut board = Board::new();
        for x in 0..9 {
            board.set(Pos::new(x, 0), CellState::Trail(P1));
        }
        board.set(Pos::new(9, 0), CellState::Head(P1));

        let history = board.trail_from(Pos::new(9, 0), P1, 5);
        assert_eq!(history.len(), 5);
        assert_eq!(history[4], Pos::new(5, 0));
        assert!(board.trail_from(Pos::new(9, 0), P1, 0).is_empty());
    }

    #[test]
    fn test_display_uses_cell_labels() {
        let mut board = Board::new();
        board.set(Pos::new(0, 0), CellState::Head(P1));
        board.set(Pos::new(1, 0), CellState::Trail(P2));
        board.set(Pos::new(2, 0), CellState::Dead(P2));

        let rendered = board.to_string();
        let first_row = rendered.lines().nth(1).unwrap();
        assert!(first_row.starts_with(" 0 p1 t2 d2 __"));
    }
}
