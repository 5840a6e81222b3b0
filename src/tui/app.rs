//! Read-only history browser.
//!
//! `App` holds a snapshot of tracker history (newest first), narrows it with
//! the same `HistoryFilter` the CLI uses, and renders a table of entries with
//! the selected entry's tasks underneath.

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};

use crate::fields::ActivityType;
use crate::query::{group_by_activity, HistoryFilter};
use crate::task::WeeklyTaskSummary;
use crate::tui::colors::{activity_color, text_on, SLATE};
use crate::tui::input::InputField;

pub struct App {
    entries: Vec<WeeklyTaskSummary>,
    /// Indices into `entries` that pass the current filter.
    visible: Vec<usize>,
    table_state: TableState,
    search: InputField,
    activity: Option<ActivityType>,
    status_message: String,
}

impl App {
    pub fn new(entries: Vec<WeeklyTaskSummary>) -> Self {
        let mut app = Self {
            entries,
            visible: Vec::new(),
            table_state: TableState::default(),
            search: InputField::new(),
            activity: None,
            status_message: String::new(),
        };
        app.apply_filter();
        app
    }

    fn filter(&self) -> HistoryFilter {
        let keyword = self.search.value().trim();
        HistoryFilter {
            activity_type: self.activity,
            keyword: (!keyword.is_empty()).then(|| keyword.to_string()),
            ..HistoryFilter::default()
        }
    }

    fn apply_filter(&mut self) {
        let filter = self.filter();
        self.visible = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| filter.matches(e))
            .map(|(i, _)| i)
            .collect();
        self.table_state.select(if self.visible.is_empty() { None } else { Some(0) });
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn selected(&self) -> Option<&WeeklyTaskSummary> {
        let pos = self.table_state.selected()?;
        self.visible.get(pos).map(|&i| &self.entries[i])
    }

    fn select_next(&mut self) {
        if self.visible.is_empty() {
            return;
        }
        let next = match self.table_state.selected() {
            Some(i) if i + 1 < self.visible.len() => i + 1,
            Some(i) => i,
            None => 0,
        };
        self.table_state.select(Some(next));
    }

    fn select_previous(&mut self) {
        if let Some(i) = self.table_state.selected() {
            self.table_state.select(Some(i.saturating_sub(1)));
        }
    }

    /// All, then each activity in turn, then back to all.
    fn cycle_activity(&mut self) {
        self.activity = match self.activity {
            None => Some(ActivityType::ALL[0]),
            Some(current) => {
                let next = current.next();
                (next != ActivityType::ALL[0]).then_some(next)
            }
        };
        self.status_message = match self.activity {
            Some(a) => format!("Showing {} only", a.display_name()),
            None => "Showing all activity types".to_string(),
        };
        self.apply_filter();
    }

    /// Apply one key press. Returns true when the browser should close.
    pub fn handle_key(&mut self, key: KeyCode) -> bool {
        if self.search.active {
            match key {
                KeyCode::Enter => self.search.active = false,
                KeyCode::Esc => {
                    self.search.active = false;
                    self.search.clear();
                    self.apply_filter();
                }
                KeyCode::Backspace => {
                    self.search.handle_backspace();
                    self.apply_filter();
                }
                KeyCode::Delete => {
                    self.search.handle_delete();
                    self.apply_filter();
                }
                KeyCode::Left => self.search.move_cursor_left(),
                KeyCode::Right => self.search.move_cursor_right(),
                KeyCode::Char(c) => {
                    self.search.handle_char(c);
                    self.apply_filter();
                }
                _ => {}
            }
            return false;
        }

        self.status_message.clear();
        match key {
            KeyCode::Char('q') => return true,
            KeyCode::Esc => {
                if self.search.value().is_empty() && self.activity.is_none() {
                    return true;
                }
                self.search.clear();
                self.activity = None;
                self.apply_filter();
            }
            KeyCode::Down | KeyCode::Char('j') => self.select_next(),
            KeyCode::Up | KeyCode::Char('k') => self.select_previous(),
            KeyCode::Home | KeyCode::Char('g') => {
                if !self.visible.is_empty() {
                    self.table_state.select(Some(0));
                }
            }
            KeyCode::End | KeyCode::Char('G') => {
                if let Some(last) = self.visible.len().checked_sub(1) {
                    self.table_state.select(Some(last));
                }
            }
            KeyCode::Char('/') => self.search.active = true,
            KeyCode::Char('a') => self.cycle_activity(),
            _ => {}
        }
        false
    }

    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(self.handle_key(key.code));
                }
            }
        }
        Ok(false)
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let counts = group_by_activity(&self.entries);
        let mut spans = vec![
            Span::styled("WEEKLY TASK TRACKER", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
        ];
        for (activity, count) in counts {
            spans.push(Span::styled(
                format!("{} {count}  ", activity.icon()),
                Style::default().fg(activity_color(activity)),
            ));
        }
        let header = Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Left);
        f.render_widget(header, area);
    }

    fn render_table(&mut self, f: &mut Frame, area: Rect) {
        let header = Row::new(vec!["Created", "Activity", "Project", "Macro", "Missed", "Update"])
            .style(Style::default().add_modifier(Modifier::BOLD))
            .bottom_margin(1);

        let rows: Vec<Row> = self
            .visible
            .iter()
            .map(|&i| {
                let entry = &self.entries[i];
                Row::new(vec![
                    Cell::from(entry.created_at.format("%Y-%m-%d %H:%M").to_string()),
                    Cell::from(Span::styled(
                        format!("{} {}", entry.activity_type.icon(), entry.activity_type.display_name()),
                        Style::default().fg(activity_color(entry.activity_type)),
                    )),
                    Cell::from(entry.project.clone().unwrap_or_else(|| "-".to_string())),
                    Cell::from(entry.generated_tasks.len().to_string()),
                    Cell::from(entry.overlooked_tasks.len().to_string()),
                    Cell::from(entry.input_excerpt.replace(['\r', '\n'], " ")),
                ])
            })
            .collect();

        let widths = [
            Constraint::Length(16), // Created
            Constraint::Length(25), // Activity
            Constraint::Length(18), // Project
            Constraint::Length(5),  // Macro
            Constraint::Length(6),  // Missed
            Constraint::Min(20),    // Update
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Updates ({}/{}) - '/' search, 'a' activity, 'q' quit",
                self.visible.len(),
                self.entries.len()
            )))
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(">> ");

        f.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn render_detail(&self, f: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Tasks");
        let Some(entry) = self.selected() else {
            let empty = Paragraph::new("No updates match the current filter.")
                .block(block)
                .alignment(Alignment::Center);
            f.render_widget(empty, area);
            return;
        };

        let bold = Style::default().add_modifier(Modifier::BOLD);
        let mut text = vec![
            Line::from(vec![Span::styled("ID: ", bold), Span::raw(entry.id.as_str())]),
            Line::from(vec![
                Span::styled("Context: ", bold),
                Span::raw(entry.context.as_deref().unwrap_or("-")),
            ]),
            Line::from(""),
            Line::from(Span::styled("Macro tasks", bold.fg(Color::Cyan))),
        ];
        text.extend(entry.generated_tasks.iter().map(|t| Line::from(format!("  • {t}"))));
        text.push(Line::from(""));
        text.push(Line::from(Span::styled("Overlooked / missing", bold.fg(Color::Yellow))));
        text.extend(entry.overlooked_tasks.iter().map(|t| Line::from(format!("  • {t}"))));

        let detail = Paragraph::new(text).block(block).wrap(Wrap { trim: false });
        f.render_widget(detail, area);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let status_text = if self.search.active {
            format!("Search: {} (Esc to clear, Enter to confirm)", self.search.value())
        } else if !self.status_message.is_empty() {
            self.status_message.clone()
        } else if !self.search.value().is_empty() {
            format!(
                "Updates: {} (filtered by '{}') | Esc to clear",
                self.visible.len(),
                self.search.value()
            )
        } else {
            format!("Updates: {} | j/k move, / search, a activity, q quit", self.visible.len())
        };

        let background = self.activity.map(activity_color).unwrap_or(SLATE);
        let status = Paragraph::new(status_text)
            .style(Style::default().bg(background).fg(text_on(background)))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    pub fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Percentage(40),
                Constraint::Length(1),
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        self.render_table(f, chunks[1]);
        self.render_detail(f, chunks[2]);
        self.render_status_bar(f, chunks[3]);
    }

    /// Draw and handle input until the user quits.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}
