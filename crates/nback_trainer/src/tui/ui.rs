//! Stateless UI rendering for the n-back grid.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use strictly_nback::{GameMode, GameState};
use strum::IntoEnumIterator;

use super::app::App;

const CELL_HEIGHT: u16 = 3;
const GRID_WIDTH: u16 = 38;

/// Largest stimulus domain the grid can lay out (16 x 16 cells).
pub const MAX_DOMAIN_SIZE: u32 = 256;

/// Renders the whole screen.
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let controller = app.controller();
    let state = controller.game_state();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(3), // Scores
            Constraint::Min(11),   // Grid
            Constraint::Length(3), // Modes
            Constraint::Length(3), // Status
            Constraint::Length(1), // Help
        ])
        .split(area);

    let title = Paragraph::new(format!("Strictly N-Back - {}-back", controller.n_back()))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    frame.render_widget(title, chunks[0]);

    let trial = match controller.current_index() {
        Some(index) => format!("{}/{}", index + 1, controller.number_of_events()),
        None => format!("-/{}", controller.number_of_events()),
    };
    let scores = Paragraph::new(format!(
        "Score {}   Correct {}   Highscore {}   Trial {}",
        controller.score(),
        controller.correct_answers(),
        controller.highscore(),
        trial
    ))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(scores, chunks[1]);

    draw_grid(
        frame,
        chunks[2],
        &state,
        *controller.config().domain_size(),
        app.last_spoken(),
    );
    draw_modes(frame, chunks[3], controller.mode());

    let status = Paragraph::new(app.status_message())
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, chunks[4]);

    let help = Paragraph::new("s start | space match | x stop | v/a/b mode | q quit")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(help, chunks[5]);
}

/// Side of the smallest square grid holding `domain_size` cells.
fn grid_side(domain_size: u32) -> u32 {
    let mut side = 1;
    while side * side < domain_size {
        side += 1;
    }
    side
}

fn draw_grid(
    frame: &mut Frame,
    area: Rect,
    state: &GameState,
    domain_size: u32,
    spoken: Option<&str>,
) {
    let side = grid_side(domain_size);
    let cell_width = (GRID_WIDTH / side as u16).saturating_sub(1).max(3);
    let grid_height = CELL_HEIGHT * side as u16 + 2;
    let grid_area = center_rect(area, (cell_width + 1) * side as u16, grid_height);

    let mut row_constraints = vec![Constraint::Length(CELL_HEIGHT); side as usize];
    row_constraints.push(Constraint::Length(2));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(row_constraints)
        .split(grid_area);

    for row in 0..side {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Length(cell_width + 1); side as usize])
            .split(rows[row as usize]);

        for col in 0..side {
            let cell = row * side + col;
            if cell >= domain_size {
                break;
            }
            let lit = state.mode().shows_grid()
                && state.is_active()
                && state.current_stimulus() == Some(cell);
            let style = if lit {
                Style::default().bg(Color::Blue)
            } else {
                Style::default()
            };
            let block = Block::default().borders(Borders::ALL).style(style);
            let slot = cols[col as usize];
            frame.render_widget(
                block,
                Rect {
                    width: slot.width.min(cell_width),
                    ..slot
                },
            );
        }
    }

    let spoken = Line::from(match spoken {
        Some(letter) => vec![
            Span::raw("Heard: "),
            Span::styled(
                letter.to_uppercase(),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
        ],
        None => vec![Span::raw("")],
    });
    frame.render_widget(
        Paragraph::new(spoken).alignment(Alignment::Center),
        rows[side as usize],
    );
}

fn draw_modes(frame: &mut Frame, area: Rect, selected: GameMode) {
    let spans: Vec<Span> = GameMode::iter()
        .flat_map(|mode| {
            let style = if mode == selected {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default()
            };
            [Span::styled(format!(" {} ", mode.label()), style), Span::raw("  ")]
        })
        .collect();
    let modes = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Mode"));
    frame.render_widget(modes, area);
}

/// Centers a rectangle of the given size within `area`.
fn center_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
