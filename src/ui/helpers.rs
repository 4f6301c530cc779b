use anyhow::Error;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;

use crate::entity::Entity;

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
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

/// One-line summary of an entity for list rows.
pub(crate) fn summary<E: Entity>(entity: &E) -> String {
    let values: Vec<String> = entity.fields().into_iter().map(|(_, value)| value).collect();
    format!("{}  {}", entity.key(), values.join(" | "))
}

/// Terminal column just past `parts` written from `origin`. Clamps at the
/// last column instead of overflowing on very long input.
pub(crate) fn cursor_column(origin: u16, parts: &[&str]) -> u16 {
    let width = parts
        .iter()
        .map(|part| part.chars().count())
        .fold(0usize, usize::saturating_add);
    origin.saturating_add(u16::try_from(width).unwrap_or(u16::MAX))
}

/// Footer spans for a `[key] label` hint.
pub(crate) fn key_hint(key: &'static str, label: &'static str) -> [Span<'static>; 2] {
    let key_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    [
        Span::styled(key, key_style),
        Span::raw(label),
    ]
}
