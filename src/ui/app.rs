use std::mem;

use anyhow::Result;
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use tracing::debug;

use crate::dispatcher::Dispatcher;
use crate::entity::Entity;

use super::forms::{ConfirmRetire, ScheduleForm};
use super::helpers::{centered_rect, cursor_column, key_hint, summary, surface_error};
use super::screens::{QueueView, RegistryScreen};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Rows given to the detail card above the queue panel.
const DETAIL_HEIGHT: u16 = 9;

/// Fine-grained modes layered over the board.
enum Mode<K> {
    Normal,
    Filtering(FilterState),
    Scheduling(ScheduleForm<K>),
    ConfirmRetire(ConfirmRetire<K>),
}

/// State for an active inline filter.
struct FilterState {
    query: String,
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state for one fleet's dispatch board.
pub struct App<E: Entity> {
    desk: Dispatcher<E>,
    registry_screen: RegistryScreen<E::Key>,
    queue_view: QueueView,
    mode: Mode<E::Key>,
    status: Option<StatusMessage>,
}

impl<E: Entity> App<E> {
    pub fn new(desk: Dispatcher<E>) -> Self {
        let mut registry_screen: RegistryScreen<E::Key> = RegistryScreen::new();
        registry_screen.refresh(desk.registry());
        Self {
            desk,
            registry_screen,
            queue_view: QueueView::Plan,
            mode: Mode::Normal,
            status: None,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<E> {
        &self.desk
    }

    /// Feed one key press through the current mode. Returns `true` when the
    /// user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mut mode = mem::replace(&mut self.mode, Mode::Normal);

        mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::Filtering(state) => self.handle_filter(code, state),
            Mode::Scheduling(form) => self.handle_schedule(code, form),
            Mode::ConfirmRetire(confirm) => self.handle_confirm_retire(code, confirm),
        };

        self.mode = mode;
        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode<E::Key>> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => *exit = true,
            KeyCode::Up => self.registry_screen.move_selection(-1),
            KeyCode::Down => self.registry_screen.move_selection(1),
            KeyCode::PageUp => self.registry_screen.move_selection(-10),
            KeyCode::PageDown => self.registry_screen.move_selection(10),
            KeyCode::Home => self.registry_screen.select_first(),
            KeyCode::End => self.registry_screen.select_last(),
            KeyCode::Tab => {
                self.queue_view = self.queue_view.toggle();
                self.clear_status();
            }
            KeyCode::Char('f') | KeyCode::Char('/') => {
                let query = self.registry_screen.filter.clone().unwrap_or_default();
                return Ok(Mode::Filtering(FilterState { query }));
            }
            KeyCode::Char('s') => return Ok(self.open_schedule_form()),
            KeyCode::Char('d') => self.dispatch_next(),
            KeyCode::Char('-') | KeyCode::Delete => return Ok(self.open_retire_confirm()),
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_filter(&mut self, code: KeyCode, mut state: FilterState) -> Mode<E::Key> {
        match code {
            KeyCode::Esc => {
                self.registry_screen.set_filter(None, self.desk.registry());
                return Mode::Normal;
            }
            KeyCode::Enter => {
                let shown = self.registry_screen.keys.len();
                self.set_status(format!("{shown} {} match.", E::KIND), StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Backspace => {
                state.query.pop();
            }
            KeyCode::Char(ch) if !ch.is_control() => state.query.push(ch),
            _ => return Mode::Filtering(state),
        }
        self.registry_screen
            .set_filter(Some(state.query.clone()), self.desk.registry());
        Mode::Filtering(state)
    }

    fn handle_schedule(&mut self, code: KeyCode, mut form: ScheduleForm<E::Key>) -> Mode<E::Key> {
        match code {
            KeyCode::Esc => {
                self.set_status("Scheduling cancelled.", StatusKind::Info);
                Mode::Normal
            }
            KeyCode::Backspace => {
                form.backspace();
                form.error = None;
                Mode::Scheduling(form)
            }
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
                Mode::Scheduling(form)
            }
            KeyCode::Enter => match form.parse_priority() {
                Ok(priority) => {
                    match self.desk.schedule_at(&form.key, priority) {
                        Ok(_) => self.set_status(
                            format!("Scheduled {} at priority {priority}.", form.key),
                            StatusKind::Info,
                        ),
                        Err(err) => self.set_status(err.to_string(), StatusKind::Error),
                    }
                    Mode::Normal
                }
                Err(err) => {
                    form.error = Some(surface_error(&err));
                    Mode::Scheduling(form)
                }
            },
            _ => Mode::Scheduling(form),
        }
    }

    fn handle_confirm_retire(
        &mut self,
        code: KeyCode,
        confirm: ConfirmRetire<E::Key>,
    ) -> Mode<E::Key> {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.desk.retire(&confirm.key) {
                    Ok(_) => {
                        self.registry_screen.refresh(self.desk.registry());
                        self.set_status(format!("Retired {}.", confirm.key), StatusKind::Info);
                    }
                    Err(err) => self.set_status(err.to_string(), StatusKind::Error),
                }
                Mode::Normal
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Mode::Normal,
            _ => Mode::ConfirmRetire(confirm),
        }
    }

    fn open_schedule_form(&mut self) -> Mode<E::Key> {
        let Some(key) = self.registry_screen.current_key().cloned() else {
            self.set_status(format!("No {} selected.", E::KIND), StatusKind::Error);
            return Mode::Normal;
        };
        match self.desk.lookup(&key) {
            Some(entity) => {
                let suggested = entity.priority();
                Mode::Scheduling(ScheduleForm::new(key, suggested))
            }
            None => {
                self.registry_screen.refresh(self.desk.registry());
                Mode::Normal
            }
        }
    }

    fn open_retire_confirm(&mut self) -> Mode<E::Key> {
        let Some(key) = self.registry_screen.current_key().cloned() else {
            self.set_status(format!("No {} selected.", E::KIND), StatusKind::Error);
            return Mode::Normal;
        };
        let pending = self
            .desk
            .registry()
            .id_of(&key)
            .map_or(0, |id| self.desk.queue().pending(id));
        Mode::ConfirmRetire(ConfirmRetire { key, pending })
    }

    fn dispatch_next(&mut self) {
        let dispatched = self.desk.dispatch().map(|next| {
            format!(
                "Dispatched {} (priority {}).",
                next.entity.key(),
                next.priority
            )
        });
        match dispatched {
            Some(message) => {
                debug!(%message, "dispatch from board");
                self.set_status(message, StatusKind::Info);
            }
            None => self.set_status("Nothing is scheduled.", StatusKind::Error),
        }
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(content_area);
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(DETAIL_HEIGHT), Constraint::Min(0)])
            .split(columns[1]);

        self.draw_registry(frame, columns[0]);
        self.draw_detail(frame, right[0]);
        self.draw_queue(frame, right[1]);

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::Filtering(state) => self.draw_filter_bar(frame, area, state),
            Mode::Scheduling(form) => self.draw_schedule_form(frame, area, form),
            Mode::ConfirmRetire(confirm) => self.draw_confirm_retire(frame, area, confirm),
            Mode::Normal => {}
        }
    }

    fn draw_registry(&self, frame: &mut Frame, area: Rect) {
        let registry = self.desk.registry();
        let title = match &self.registry_screen.filter {
            Some(query) => format!(
                "Registry: {} of {} {} matching \"{query}\"",
                self.registry_screen.keys.len(),
                registry.len(),
                E::KIND
            ),
            None => format!("Registry: {} {}", registry.len(), E::KIND),
        };
        let block = Block::default().title(title).borders(Borders::ALL);

        let items: Vec<ListItem> = self
            .registry_screen
            .keys
            .iter()
            .filter_map(|key| {
                let id = registry.id_of(key)?;
                let entity = registry.get(id)?;
                let marker = if self.desk.is_scheduled(id) { "* " } else { "  " };
                Some(ListItem::new(format!("{marker}{}", summary(entity))))
            })
            .collect();

        if items.is_empty() {
            let empty = Paragraph::new(Span::styled(
                format!("No {} to show.", E::KIND),
                Style::default().fg(Color::DarkGray),
            ))
            .block(block);
            frame.render_widget(empty, area);
            return;
        }

        let list = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");
        let mut list_state = ListState::default();
        list_state.select(Some(self.registry_screen.selected));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn draw_detail(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().title("Details").borders(Borders::ALL);
        let selected = self
            .registry_screen
            .current_key()
            .and_then(|key| self.desk.lookup(key));

        let lines = match selected {
            Some(entity) => {
                let label_style = Style::default().fg(Color::Gray);
                let mut lines = vec![Line::from(Span::styled(
                    entity.key().to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ))];
                lines.extend(entity.fields().into_iter().map(|(label, value)| {
                    Line::from(vec![
                        Span::styled(format!("{label}: "), label_style),
                        Span::raw(value),
                    ])
                }));
                lines.push(Line::from(vec![
                    Span::styled("Priority: ", label_style),
                    Span::raw(entity.priority().to_string()),
                ]));
                lines
            }
            None => vec![Line::from("")],
        };

        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn draw_queue(&self, frame: &mut Frame, area: Rect) {
        let queue = self.desk.queue();
        let title = format!(
            "{} [{} order, {}/{}]",
            self.queue_view.title(),
            queue.order(),
            queue.len(),
            queue.capacity()
        );
        let block = Block::default().title(title).borders(Borders::ALL);

        let rows: Vec<ListItem> = match self.queue_view {
            QueueView::Heap => self
                .desk
                .pending()
                .enumerate()
                .map(|(slot, entry)| {
                    ListItem::new(format!("[{slot:>3}] {:>14}  {}", entry.priority, entry.entity.key()))
                })
                .collect(),
            QueueView::Plan => self
                .desk
                .plan()
                .enumerate()
                .map(|(rank, entry)| {
                    ListItem::new(format!("{:>4}. {:>14}  {}", rank + 1, entry.priority, entry.entity.key()))
                })
                .collect(),
        };

        if rows.is_empty() {
            let empty = Paragraph::new(Span::styled(
                "Queue is empty.",
                Style::default().fg(Color::DarkGray),
            ))
            .block(block);
            frame.render_widget(empty, area);
        } else {
            frame.render_widget(List::new(rows).block(block), area);
        }
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let hints: &[(&'static str, &'static str)] = match &self.mode {
            Mode::Normal => &[
                ("[Up/Down]", " Move   "),
                ("[s]", " Schedule   "),
                ("[d]", " Dispatch   "),
                ("[-]", " Retire   "),
                ("[f]", " Filter   "),
                ("[Tab]", " Heap/Plan   "),
                ("[q]", " Quit"),
            ],
            Mode::Filtering(_) => &[("[Enter]", " Keep filter   "), ("[Esc]", " Clear")],
            Mode::Scheduling(_) => &[("[Enter]", " Schedule   "), ("[Esc]", " Cancel")],
            Mode::ConfirmRetire(_) => &[("[y]", " Retire   "), ("[n]", " Keep")],
        };
        Line::from(
            hints
                .iter()
                .flat_map(|&(key, label)| key_hint(key, label))
                .collect::<Vec<_>>(),
        )
    }

    fn draw_filter_bar(&self, frame: &mut Frame, area: Rect, state: &FilterState) {
        let height = 3u16.min(area.height);
        let popup_area = Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height,
        };
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title("Filter");
        let paragraph = Paragraph::new(Span::raw(format!("Filter: {}", state.query)))
            .block(block.clone())
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);

        let inner = block.inner(popup_area);
        let cursor_x = cursor_column(inner.x, &["Filter: ", &state.query]);
        frame.set_cursor_position((cursor_x, inner.y));
    }

    fn draw_schedule_form(&self, frame: &mut Frame, area: Rect, form: &ScheduleForm<E::Key>) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(format!("Schedule {}", form.key))
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![form.build_line(), Line::from("")];
        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                format!("Served {} first. Enter to queue, Esc to cancel.", self.desk.queue().order()),
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
        frame.set_cursor_position((form.cursor_column(inner.x), inner.y));
    }

    fn draw_confirm_retire(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmRetire<E::Key>) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Confirm Retirement")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![Line::from(format!("Retire {} {}?", E::KIND, confirm.key))];
        if confirm.pending > 0 {
            lines.push(Line::from(Span::styled(
                format!(
                    "It still has {} pending dispatch entries and will be kept.",
                    confirm.pending
                ),
                Style::default().fg(Color::Red),
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Press Y to confirm or N / Esc to cancel.",
            Style::default().fg(Color::Gray),
        )));

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Drone, Flight};
    use crate::seed::{sample_drones, sample_flights};

    fn board<E: Entity + std::fmt::Debug>(entities: Vec<E>) -> App<E> {
        let mut desk = Dispatcher::default();
        for entity in entities {
            desk.register(entity).unwrap();
        }
        App::new(desk)
    }

    fn press<E: Entity>(app: &mut App<E>, keys: &[KeyCode]) {
        for key in keys {
            assert!(!app.handle_key(*key).unwrap());
        }
    }

    #[test]
    fn test_schedule_form_uses_suggested_priority() {
        let mut app = board(sample_drones());
        press(&mut app, &[KeyCode::Char('s'), KeyCode::Enter]);

        let next = app.dispatcher().next().unwrap();
        assert_eq!(next.entity.delivery.drone_id, "D1");
        assert_eq!(next.priority, 90);
    }

    #[test]
    fn test_retire_is_refused_while_scheduled() {
        let mut app = board(sample_drones());
        press(
            &mut app,
            &[KeyCode::Char('s'), KeyCode::Enter, KeyCode::Char('-'), KeyCode::Char('y')],
        );
        assert_eq!(app.dispatcher().registry().len(), 3);
        assert!(matches!(
            app.status,
            Some(StatusMessage {
                kind: StatusKind::Error,
                ..
            })
        ));

        press(&mut app, &[KeyCode::Char('d'), KeyCode::Char('-'), KeyCode::Char('y')]);
        assert_eq!(app.dispatcher().registry().len(), 2);
        assert_eq!(app.registry_screen.keys.len(), 2);
    }

    #[test]
    fn test_filter_narrows_registry_panel() {
        let mut app = board(sample_flights());
        let mut keys = vec![KeyCode::Char('f')];
        keys.extend("ryanair".chars().map(KeyCode::Char));
        keys.push(KeyCode::Enter);
        press(&mut app, &keys);

        let shown: Vec<&str> = app.registry_screen.keys.iter().map(String::as_str).collect();
        assert_eq!(shown, ["FR102"]);

        press(&mut app, &[KeyCode::Char('f'), KeyCode::Esc]);
        assert_eq!(app.registry_screen.keys.len(), 4);
    }

    #[test]
    fn test_custom_priority_and_quit() {
        let mut app: App<Flight> = board(sample_flights());
        press(&mut app, &[KeyCode::Char('s')]);
        for _ in 0..12 {
            press(&mut app, &[KeyCode::Backspace]);
        }
        press(&mut app, &[KeyCode::Char('7'), KeyCode::Enter]);
        assert_eq!(app.dispatcher().next().map(|s| s.priority), Some(7));

        press(&mut app, &[KeyCode::Tab]);
        assert_eq!(app.queue_view, QueueView::Heap);
        assert!(app.handle_key(KeyCode::Char('q')).unwrap());
    }

    #[test]
    fn test_dispatch_on_empty_queue_reports() {
        let mut app: App<Drone> = board(Vec::new());
        press(&mut app, &[KeyCode::Char('d'), KeyCode::Char('s')]);
        assert!(app.dispatcher().queue().is_empty());
    }
}
