use anyhow::Error;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::models::Recipe;

/// Colors for the two display themes. Everything the page draws styles
/// itself from one of these four roles so toggling the theme repaints the
/// whole page consistently.
pub(crate) struct Palette {
    pub(crate) background: Color,
    pub(crate) text: Color,
    pub(crate) dim: Color,
    pub(crate) accent: Color,
}

/// Resolve the palette for the persisted display preference.
pub(crate) fn palette(dark_mode: bool) -> Palette {
    if dark_mode {
        Palette {
            background: Color::Black,
            text: Color::White,
            dim: Color::DarkGray,
            accent: Color::Yellow,
        }
    } else {
        Palette {
            background: Color::White,
            text: Color::Black,
            dim: Color::Gray,
            accent: Color::Blue,
        }
    }
}

/// Build the textual payload for one recipe card: name, category line,
/// instructions excerpt, and a video marker when the record carries a
/// link. The selected card gets the accent color on its name.
pub(crate) fn build_recipe_card_lines(
    recipe: &Recipe,
    selected: bool,
    palette: &Palette,
) -> Vec<Line<'static>> {
    let name_color = if selected {
        palette.accent
    } else {
        palette.text
    };
    let mut lines = vec![
        Line::from(Span::styled(
            recipe.name.clone(),
            Style::default()
                .fg(name_color)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("Category: {}", recipe.category_label()),
            Style::default().fg(palette.dim),
        )),
        Line::from(Span::styled(
            recipe.summary(),
            Style::default().fg(palette.text),
        )),
    ];
    if recipe.video_url.is_some() {
        lines.push(Line::from(Span::styled(
            "> Watch Video",
            Style::default().fg(palette.accent),
        )));
    }
    lines
}

/// Produce a rectangle centered within `area` that spans the requested
/// percent of the width and height. Used for the detail modal.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Extract the most relevant error message from a chained error.
pub(crate) fn surface_error(err: &Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}
