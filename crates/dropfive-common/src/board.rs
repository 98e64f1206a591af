use std::fmt;

use serde::{Deserialize, Serialize};

pub const ROWS: usize = 6;
pub const COLUMNS: usize = 9;
pub const WIN_LENGTH: usize = 5;

// -- Pieces --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Piece {
    X,
    O,
}

impl Piece {
    /// Slot 0 always plays `x`, slot 1 plays `o`.
    pub fn for_slot(slot: usize) -> Self {
        if slot == 0 {
            Piece::X
        } else {
            Piece::O
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Piece::X => 'x',
            Piece::O => 'o',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub won: bool,
    pub row: usize,
    pub column: usize,
}

// -- Diagonal geometry --

/// The two diagonal directions, named by how they look on the rendered board.
/// A `Rising` diagonal climbs to the right (column shrinks as the row grows),
/// a `Falling` one descends to the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagonal {
    Rising,
    Falling,
}

impl Diagonal {
    fn column_step(self) -> isize {
        match self {
            Diagonal::Rising => -1,
            Diagonal::Falling => 1,
        }
    }

    /// Column of the top cell of the five-long window that begins on
    /// `start_row` and passes through `(row, column)`, or `None` when that
    /// window would leave the board.
    pub fn window_start(self, row: usize, column: usize, start_row: usize) -> Option<usize> {
        if row < start_row || row >= start_row + WIN_LENGTH || start_row + WIN_LENGTH > ROWS {
            return None;
        }
        let offset = (row - start_row) as isize;
        let start_col = column as isize - self.column_step() * offset;
        let end_col = start_col + self.column_step() * (WIN_LENGTH as isize - 1);
        let on_board = 0..COLUMNS as isize;
        (on_board.contains(&start_col) && on_board.contains(&end_col)).then_some(start_col as usize)
    }

    /// Whether any five-long run along this diagonal can include `(row, column)`.
    pub fn reaches_five(self, row: usize, column: usize) -> bool {
        (0..=ROWS - WIN_LENGTH).any(|start_row| self.window_start(row, column, start_row).is_some())
    }
}

// -- Board --

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [[Option<Piece>; COLUMNS]; ROWS],
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: [[None; COLUMNS]; ROWS],
        }
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<Piece> {
        self.cells[row][column]
    }

    pub fn is_column_full(&self, column: usize) -> bool {
        self.cells[0][column].is_some()
    }

    pub fn is_board_full(&self) -> bool {
        self.cells[0].iter().all(Option::is_some)
    }

    pub fn reset_board(&mut self) {
        self.cells = [[None; COLUMNS]; ROWS];
    }

    /// Drop `piece` into `column` (0-indexed) and report where it landed and
    /// whether it completed a run of five.
    pub fn insert_piece(&mut self, piece: Piece, column: usize) -> Result<Placement, BoardError> {
        if column >= COLUMNS {
            return Err(BoardError::InvalidColumn { column });
        }
        if self.is_column_full(column) {
            return Err(BoardError::ColumnFull { column });
        }
        let row = self.drop_piece(piece, column);
        Ok(Placement {
            won: self.is_winning_move(row, column, piece),
            row,
            column,
        })
    }

    pub fn render(&self) -> String {
        let mut output = String::with_capacity(ROWS * (COLUMNS * 6 + 1));
        for row in &self.cells {
            for cell in row {
                let symbol = cell.map(Piece::symbol).unwrap_or(' ');
                output.push_str(&format!("[ {} ] ", symbol));
            }
            output.push('\n');
        }
        output
    }

    fn drop_piece(&mut self, piece: Piece, column: usize) -> usize {
        // Caller guarantees row 0 is empty, so the first occupied row is >= 1.
        let row = (0..ROWS)
            .find(|&row| self.cells[row][column].is_some())
            .map_or(ROWS - 1, |occupied| occupied - 1);
        self.cells[row][column] = Some(piece);
        row
    }

    fn is_winning_move(&self, row: usize, column: usize, piece: Piece) -> bool {
        self.is_horizontal_match(row, piece)
            || self.is_vertical_match(column, piece)
            || self.is_diagonal_match(Diagonal::Rising, row, column, piece)
            || self.is_diagonal_match(Diagonal::Falling, row, column, piece)
    }

    fn is_horizontal_match(&self, row: usize, piece: Piece) -> bool {
        (0..=COLUMNS - WIN_LENGTH).any(|start_col| self.is_run(row, start_col, 0, 1, piece))
    }

    fn is_vertical_match(&self, column: usize, piece: Piece) -> bool {
        (0..=ROWS - WIN_LENGTH)
            .find(|&start_row| self.cells[start_row][column] == Some(piece))
            .is_some_and(|start_row| self.is_run(start_row, column, 1, 0, piece))
    }

    fn is_diagonal_match(
        &self,
        diagonal: Diagonal,
        row: usize,
        column: usize,
        piece: Piece,
    ) -> bool {
        if !diagonal.reaches_five(row, column) {
            return false;
        }
        (0..=ROWS - WIN_LENGTH)
            .filter_map(|start_row| {
                diagonal
                    .window_start(row, column, start_row)
                    .map(|start_col| (start_row, start_col))
            })
            .find(|&(start_row, start_col)| self.cells[start_row][start_col] == Some(piece))
            .is_some_and(|(start_row, start_col)| {
                self.is_run(start_row, start_col, 1, diagonal.column_step(), piece)
            })
    }

    /// Bounds are the caller's responsibility: the whole window must lie on the board.
    fn is_run(
        &self,
        row: usize,
        column: usize,
        row_step: usize,
        column_step: isize,
        piece: Piece,
    ) -> bool {
        (0..WIN_LENGTH).all(|i| {
            let r = row + row_step * i;
            let c = (column as isize + column_step * i as isize) as usize;
            self.cells[r][c] == Some(piece)
        })
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

// -- Errors --

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("Column {} is already full. Please select another column", .column + 1)]
    ColumnFull { column: usize },
    #[error("Column {} does not exist", .column + 1)]
    InvalidColumn { column: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_column(board: &mut Board, column: usize, piece: Piece) {
        for row in 0..ROWS {
            board.cells[row][column] = Some(piece);
        }
    }

    fn drop_all(board: &mut Board, piece: Piece, columns: &[usize]) -> Placement {
        let mut last = None;
        for &column in columns {
            last = Some(board.insert_piece(piece, column).unwrap());
        }
        last.unwrap()
    }

    #[test]
    fn test_drop_into_empty_column_lands_on_bottom() {
        for column in 0..COLUMNS {
            let mut board = Board::new();
            let placement = board.insert_piece(Piece::X, column).unwrap();
            assert_eq!(placement.row, ROWS - 1);
            assert_eq!(placement.column, column);
            assert!(!placement.won);
            assert_eq!(board.cell(ROWS - 1, column), Some(Piece::X));
        }
    }

    #[test]
    fn test_alternating_bottom_row_never_wins() {
        let mut board = Board::new();
        for column in 0..COLUMNS {
            let piece = Piece::for_slot(column % 2);
            let placement = board.insert_piece(piece, column).unwrap();
            assert_eq!(placement.row, ROWS - 1);
            assert!(!placement.won);
        }
    }

    #[test]
    fn test_pieces_stack_upwards() {
        let mut board = Board::new();
        for expected_row in (0..ROWS).rev() {
            let piece = if expected_row % 2 == 0 { Piece::X } else { Piece::O };
            let placement = board.insert_piece(piece, 2).unwrap();
            assert_eq!(placement.row, expected_row);
        }
        assert!(board.is_column_full(2));
    }

    #[test]
    fn test_seventh_drop_fails_and_leaves_board_unchanged() {
        for column in 0..COLUMNS {
            let mut board = Board::new();
            for i in 0..ROWS {
                let piece = if i % 2 == 0 { Piece::X } else { Piece::O };
                board.insert_piece(piece, column).unwrap();
            }
            let before = board.clone();
            let err = board.insert_piece(Piece::X, column).unwrap_err();
            assert_eq!(err, BoardError::ColumnFull { column });
            assert_eq!(board, before);
        }
    }

    #[test]
    fn test_column_full_message_is_one_indexed() {
        let mut board = Board::new();
        fill_column(&mut board, 0, Piece::X);
        let err = board.insert_piece(Piece::O, 0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Column 1 is already full. Please select another column"
        );
    }

    #[test]
    fn test_invalid_column_rejected() {
        let mut board = Board::new();
        assert_eq!(
            board.insert_piece(Piece::X, COLUMNS),
            Err(BoardError::InvalidColumn { column: COLUMNS })
        );
        assert_eq!(board, Board::new());
    }

    #[test]
    fn test_horizontal_five_wins() {
        let mut board = Board::new();
        let placement = drop_all(&mut board, Piece::X, &[2, 3, 4, 5, 6]);
        assert!(placement.won);
    }

    #[test]
    fn test_horizontal_win_when_last_piece_fills_the_middle() {
        let mut board = Board::new();
        drop_all(&mut board, Piece::X, &[4, 5, 7, 8]);
        let placement = board.insert_piece(Piece::X, 6).unwrap();
        assert!(placement.won);
    }

    #[test]
    fn test_horizontal_four_does_not_win() {
        let mut board = Board::new();
        let placement = drop_all(&mut board, Piece::X, &[0, 1, 2, 3]);
        assert!(!placement.won);
    }

    #[test]
    fn test_horizontal_run_interrupted_does_not_win() {
        let mut board = Board::new();
        drop_all(&mut board, Piece::X, &[0, 1, 3, 4]);
        board.insert_piece(Piece::O, 2).unwrap();
        let placement = board.insert_piece(Piece::X, 5).unwrap();
        assert!(!placement.won);
    }

    #[test]
    fn test_horizontal_run_after_opponent_piece_wins() {
        let mut board = Board::new();
        board.insert_piece(Piece::O, 0).unwrap();
        let placement = drop_all(&mut board, Piece::X, &[1, 2, 3, 4, 5]);
        assert!(placement.won);
    }

    #[test]
    fn test_vertical_five_wins() {
        let mut board = Board::new();
        let placement = drop_all(&mut board, Piece::O, &[7, 7, 7, 7, 7]);
        assert!(placement.won);
        assert_eq!(placement.row, 1);
    }

    #[test]
    fn test_vertical_five_on_top_of_opponent_wins() {
        let mut board = Board::new();
        board.insert_piece(Piece::X, 3).unwrap();
        let placement = drop_all(&mut board, Piece::O, &[3, 3, 3, 3, 3]);
        assert!(placement.won);
        assert_eq!(placement.row, 0);
    }

    #[test]
    fn test_vertical_four_does_not_win() {
        let mut board = Board::new();
        let placement = drop_all(&mut board, Piece::O, &[7, 7, 7, 7]);
        assert!(!placement.won);
    }

    #[test]
    fn test_vertical_interrupted_does_not_win() {
        let mut board = Board::new();
        drop_all(&mut board, Piece::X, &[0, 0, 0]);
        board.insert_piece(Piece::O, 0).unwrap();
        let placement = drop_all(&mut board, Piece::X, &[0, 0]);
        assert!(!placement.won);
    }

    /// Builds the staircase under a diagonal so the last drop completes it.
    fn build_diagonal(board: &mut Board, cells: &[(usize, usize)], piece: Piece) -> Placement {
        let filler = if piece == Piece::X { Piece::O } else { Piece::X };
        let mut last = None;
        for &(row, column) in cells {
            for _ in row + 1..ROWS {
                board.insert_piece(filler, column).unwrap();
            }
            let placement = board.insert_piece(piece, column).unwrap();
            assert_eq!(placement.row, row);
            last = Some(placement);
        }
        last.unwrap()
    }

    #[test]
    fn test_falling_diagonal_wins() {
        let mut board = Board::new();
        let cells = [(1, 2), (2, 3), (3, 4), (4, 5), (5, 6)];
        let placement = build_diagonal(&mut board, &cells, Piece::X);
        assert!(placement.won);
    }

    #[test]
    fn test_rising_diagonal_wins() {
        let mut board = Board::new();
        let cells = [(5, 0), (4, 1), (3, 2), (2, 3), (1, 4)];
        let placement = build_diagonal(&mut board, &cells, Piece::O);
        assert!(placement.won);
    }

    #[test]
    fn test_rising_diagonal_from_top_row_wins() {
        let mut board = Board::new();
        let cells = [(4, 4), (3, 5), (2, 6), (1, 7), (0, 8)];
        let placement = build_diagonal(&mut board, &cells, Piece::X);
        assert!(placement.won);
    }

    #[test]
    fn test_diagonal_four_does_not_win() {
        let mut board = Board::new();
        let cells = [(2, 3), (3, 4), (4, 5), (5, 6)];
        let placement = build_diagonal(&mut board, &cells, Piece::X);
        assert!(!placement.won);
    }

    #[test]
    fn test_diagonal_interrupted_does_not_win() {
        let mut board = Board::new();
        build_diagonal(&mut board, &[(1, 2), (2, 3)], Piece::X);
        build_diagonal(&mut board, &[(3, 4)], Piece::O);
        let placement = build_diagonal(&mut board, &[(4, 5), (5, 6)], Piece::X);
        assert!(!placement.won);
    }

    #[test]
    fn test_rising_diagonal_window_geometry() {
        // Corners: only the anti-diagonal corners can host a rising run.
        assert!(!Diagonal::Rising.reaches_five(0, 0));
        assert!(Diagonal::Rising.reaches_five(0, 8));
        assert!(Diagonal::Rising.reaches_five(5, 0));
        assert!(!Diagonal::Rising.reaches_five(5, 8));
        assert!(Diagonal::Rising.reaches_five(0, 4));
        assert!(!Diagonal::Rising.reaches_five(0, 3));
        assert!(Diagonal::Rising.reaches_five(5, 4));
        assert!(!Diagonal::Rising.reaches_five(5, 5));
        assert!(Diagonal::Rising.reaches_five(3, 3));
        assert!(!Diagonal::Rising.reaches_five(3, 0));

        assert_eq!(Diagonal::Rising.window_start(3, 3, 0), Some(6));
        assert_eq!(Diagonal::Rising.window_start(3, 3, 1), Some(5));
        assert_eq!(Diagonal::Rising.window_start(5, 0, 0), None);
        assert_eq!(Diagonal::Rising.window_start(5, 0, 1), Some(4));
        assert_eq!(Diagonal::Rising.window_start(0, 8, 1), None);
    }

    #[test]
    fn test_falling_diagonal_window_geometry() {
        assert!(Diagonal::Falling.reaches_five(0, 0));
        assert!(!Diagonal::Falling.reaches_five(0, 8));
        assert!(!Diagonal::Falling.reaches_five(5, 0));
        assert!(Diagonal::Falling.reaches_five(5, 8));
        assert!(Diagonal::Falling.reaches_five(0, 4));
        assert!(!Diagonal::Falling.reaches_five(0, 5));
        assert!(Diagonal::Falling.reaches_five(5, 4));
        assert!(!Diagonal::Falling.reaches_five(5, 3));
        assert!(!Diagonal::Falling.reaches_five(3, 0));
        assert!(!Diagonal::Falling.reaches_five(2, 8));

        assert_eq!(Diagonal::Falling.window_start(2, 2, 0), Some(0));
        assert_eq!(Diagonal::Falling.window_start(2, 2, 1), Some(1));
        assert_eq!(Diagonal::Falling.window_start(5, 8, 1), Some(4));
        assert_eq!(Diagonal::Falling.window_start(0, 0, 1), None);
    }

    #[test]
    fn test_every_cell_geometry_matches_diagonal_length() {
        // A diagonal offers a run of five iff it holds at least five cells
        // within a window containing the cell; cross-check against a brute count.
        for row in 0..ROWS {
            for column in 0..COLUMNS {
                for diagonal in [Diagonal::Rising, Diagonal::Falling] {
                    let step = diagonal.column_step();
                    let expected = (0..ROWS as isize).any(|start_row| {
                        (0..WIN_LENGTH as isize).all(|i| {
                            let r = start_row + i;
                            let c = column as isize + step * (r - row as isize);
                            (0..ROWS as isize).contains(&r) && (0..COLUMNS as isize).contains(&c)
                        }) && (start_row..start_row + WIN_LENGTH as isize).contains(&(row as isize))
                    });
                    assert_eq!(
                        diagonal.reaches_five(row, column),
                        expected,
                        "{:?} at ({}, {})",
                        diagonal,
                        row,
                        column
                    );
                }
            }
        }
    }

    #[test]
    fn test_is_board_full_only_checks_top_row() {
        let mut board = Board::new();
        assert!(!board.is_board_full());
        for column in 0..COLUMNS {
            board.cells[0][column] = Some(Piece::O);
        }
        assert!(board.is_board_full());
        board.cells[0][4] = None;
        assert!(!board.is_board_full());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut board = Board::new();
        for column in 0..COLUMNS {
            fill_column(&mut board, column, Piece::X);
        }
        assert!(board.is_board_full());
        board.reset_board();
        assert!(!board.is_board_full());
        assert_eq!(board, Board::new());
    }

    #[test]
    fn test_render_layout() {
        let mut board = Board::new();
        board.insert_piece(Piece::X, 0).unwrap();
        board.insert_piece(Piece::O, 8).unwrap();
        let rendered = board.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), ROWS);
        assert_eq!(lines[0], "[   ] ".repeat(COLUMNS));
        assert_eq!(
            lines[5],
            format!("[ x ] {}[ o ] ", "[   ] ".repeat(COLUMNS - 2))
        );
        assert!(rendered.ends_with('\n'));
        assert_eq!(board.to_string(), rendered);
    }
}
