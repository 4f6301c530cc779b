use anyhow::{anyhow, Context, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::entity::Priority;

use super::helpers::cursor_column;

/// Priority prompt shown before an entity is queued.
pub(crate) struct ScheduleForm<K> {
    pub(crate) key: K,
    pub(crate) priority: String,
    pub(crate) error: Option<String>,
}

impl<K> ScheduleForm<K> {
    /// Seed the form with the entity's own priority so Enter alone accepts it.
    pub(crate) fn new(key: K, suggested: Priority) -> Self {
        Self {
            key,
            priority: suggested.to_string(),
            error: None,
        }
    }

    /// Digits anywhere, a minus sign only in front.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_ascii_digit() || (ch == '-' && self.priority.is_empty()) {
            self.priority.push(ch);
            true
        } else {
            false
        }
    }

    pub(crate) fn backspace(&mut self) {
        self.priority.pop();
    }

    pub(crate) fn parse_priority(&self) -> Result<Priority> {
        let raw = self.priority.trim();
        if raw.is_empty() {
            return Err(anyhow!("Priority is required."));
        }
        raw.parse::<Priority>()
            .context("Priority must be an integer.")
    }

    pub(crate) fn build_line(&self) -> Line<'static> {
        let (display, style) = if self.priority.is_empty() {
            ("<required>".to_string(), Style::default().fg(Color::DarkGray))
        } else {
            (self.priority.clone(), Style::default().fg(Color::Yellow))
        };
        Line::from(vec![
            Span::raw(format!("{}: ", Self::LABEL)),
            Span::styled(display, style),
        ])
    }

    /// Column of the input cursor when the form line starts at `origin`.
    pub(crate) fn cursor_column(&self, origin: u16) -> u16 {
        cursor_column(origin, &[Self::LABEL, ": ", &self.priority])
    }

    const LABEL: &'static str = "Priority";
}

/// State for confirming that an entity should leave the registry.
pub(crate) struct ConfirmRetire<K> {
    pub(crate) key: K,
    pub(crate) pending: usize,
}
