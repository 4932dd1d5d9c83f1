use crate::game::ViewState;
use macroquad::prelude::*;
use peer::Outcome;
use shared::{CellState, PlayerId, Pos, BOARD_SIZE};

const MARGIN: f32 = 40.0;
const STATUS_HEIGHT: f32 = 30.0;

/// Screen placement of the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardLayout {
    pub origin_x: f32,
    pub origin_y: f32,
    pub cell: f32,
}

impl BoardLayout {
    /// Largest square grid that fits the window, centered horizontally,
    /// leaving room for the status line on top.
    pub fn fit(width: f32, height: f32) -> Self {
        let available_w = (width - 2.0 * MARGIN).max(0.0);
        let available_h = (height - 2.0 * MARGIN - STATUS_HEIGHT).max(0.0);
        let cell = available_w.min(available_h) / BOARD_SIZE as f32;
        let side = cell * BOARD_SIZE as f32;

        Self {
            origin_x: (width - side) / 2.0,
            origin_y: MARGIN + STATUS_HEIGHT,
            cell,
        }
    }

    pub fn side(&self) -> f32 {
        self.cell * BOARD_SIZE as f32
    }

    /// Top-left corner of a cell.
    pub fn cell_origin(&self, pos: Pos) -> (f32, f32) {
        (
            self.origin_x + pos.x as f32 * self.cell,
            self.origin_y + pos.y as f32 * self.cell,
        )
    }
}

pub fn player_color(id: PlayerId) -> Color {
    match id.slot() {
        1 => Color::from_rgba(0, 200, 255, 255),
        2 => Color::from_rgba(255, 140, 0, 255),
        3 => GREEN,
        4 => MAGENTA,
        5 => YELLOW,
        6 => Color::from_rgba(255, 68, 68, 255),
        _ => WHITE,
    }
}

/// Trail cells fade, except the last few behind each head.
fn cell_color(cell: CellState, recent: bool) -> Option<Color> {
    match cell {
        CellState::Empty => None,
        CellState::Head(id) => Some(player_color(id)),
        CellState::Trail(id) => {
            let mut color = player_color(id);
            color.a = if recent { 0.7 } else { 0.45 };
            Some(color)
        }
        CellState::Dead(_) => Some(Color::from_rgba(136, 136, 136, 255)),
    }
}

pub struct Renderer {
    layout: BoardLayout,
}

impl Renderer {
    pub fn new(width: f32, height: f32) -> Self {
        Renderer {
            layout: BoardLayout::fit(width, height),
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.layout = BoardLayout::fit(width, height);
    }

    pub fn render(&self, view: &ViewState) {
        clear_background(Color::from_rgba(26, 26, 26, 255));
        self.draw_grid();
        self.draw_cells(view);
        self.draw_status(view);
    }

    fn draw_grid(&self) {
        let side = self.layout.side();
        draw_rectangle(
            self.layout.origin_x,
            self.layout.origin_y,
            side,
            side,
            Color::from_rgba(40, 40, 40, 255),
        );
        for i in 0..=BOARD_SIZE {
            let offset = i as f32 * self.layout.cell;
            let line = Color::from_rgba(68, 68, 68, 255);
            draw_line(
                self.layout.origin_x + offset,
                self.layout.origin_y,
                self.layout.origin_x + offset,
                self.layout.origin_y + side,
                1.0,
                line,
            );
            draw_line(
                self.layout.origin_x,
                self.layout.origin_y + offset,
                self.layout.origin_x + side,
                self.layout.origin_y + offset,
                1.0,
                line,
            );
        }
    }

    fn draw_cells(&self, view: &ViewState) {
        let cell = self.layout.cell;
        for (y, row) in view.board.rows().enumerate() {
            for (x, state) in row.iter().enumerate() {
                let pos = Pos::new(x as i32, y as i32);
                let Some(color) = cell_color(*state, view.is_recent(pos)) else {
                    continue;
                };
                let (px, py) = self.layout.cell_origin(pos);
                draw_rectangle(px + 1.0, py + 1.0, cell - 2.0, cell - 2.0, color);

                if let CellState::Head(id) = state {
                    if Some(*id) == view.local {
                        draw_rectangle_lines(px + 1.0, py + 1.0, cell - 2.0, cell - 2.0, 2.0, WHITE);
                    }
                }
            }
        }
    }

    fn draw_status(&self, view: &ViewState) {
        let text = match (view.error.as_ref(), view.local, view.outcome) {
            (Some(error), _, _) => format!("Error: {}", error),
            (None, None, _) => "Waiting for matchmaking...".to_string(),
            (None, Some(local), Some(Outcome::Winner(id))) if id == local => "You win!".to_string(),
            (None, Some(_), Some(Outcome::Winner(id))) => format!("{} wins", id),
            (None, Some(_), Some(Outcome::Draw)) => "Draw".to_string(),
            (None, Some(local), None) if view.is_dead(local) => {
                format!("You ({}) crashed, spectating", local)
            }
            (None, Some(local), None) => format!("Playing as {}, steer with arrows or WASD", local),
        };
        draw_text(&text, self.layout.origin_x, MARGIN + 10.0, 24.0, WHITE);
    }
}
