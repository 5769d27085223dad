use std::io;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::deadline;
use crate::notify::{NotificationSink, PopupQueue};
use crate::reminder;
use crate::store::TaskStore;
use crate::task::{TaskError, TaskRecord};
use crate::task_board::TaskBoard;

/// State behind the interactive screen.
pub struct App {
    pub board: TaskBoard,
    pub popups: PopupQueue,
    pub status: Option<String>,
    pub should_quit: bool,
    store: TaskStore,
}

impl App {
    pub fn new(board: TaskBoard, store: TaskStore) -> Self {
        Self {
            board,
            popups: PopupQueue::default(),
            status: None,
            should_quit: false,
            store,
        }
    }

    /// Queues an alert for every task that is already overdue.
    pub fn startup_sweep(&mut self, now: NaiveDateTime) {
        for message in reminder::sweep_overdue(self.board.records(), now) {
            self.popups.notify(&message);
        }
    }

    /// Runs due reminders. Nothing runs while an alert is open, and periods
    /// missed meanwhile are skipped rather than replayed.
    pub fn tick(&mut self, now: NaiveDateTime) {
        if self.popups.current().is_some() {
            return;
        }
        self.board.tick(now, &mut self.popups);
    }

    pub fn add_task(
        &mut self,
        text: &str,
        date: &str,
        time: &str,
        meridiem: &str,
        now: NaiveDateTime,
    ) -> Result<(), TaskError> {
        let record = TaskRecord::from_input(text, date, time, meridiem)?;
        self.board.add(record, now);
        self.board.selected = self.board.len() - 1;
        self.save();
        Ok(())
    }

    /// Replaces the selected task. Empty answers keep the old value.
    pub fn edit_selected(
        &mut self,
        text: &str,
        date: &str,
        time: &str,
        meridiem: &str,
        now: NaiveDateTime,
    ) -> Result<(), TaskError> {
        let Some(id) = self.board.selected_id() else {
            return Err(TaskError::NotFound(self.board.selected + 1));
        };
        let Some(old) = self.board.get(id) else {
            return Err(TaskError::NotFound(self.board.selected + 1));
        };
        let keep = |answer: &str, old: String| {
            if answer.trim().is_empty() {
                old
            } else {
                answer.to_string()
            }
        };
        let text = keep(text, old.text.clone());
        let date = keep(date, old.due_date.format("%Y-%m-%d").to_string());
        let time = keep(time, old.due_time.to_string());
        let meridiem = keep(meridiem, old.meridiem.to_string());

        let update = TaskRecord::from_input(&text, &date, &time, &meridiem)?;
        self.board.edit(id, update, now);
        self.save();
        Ok(())
    }

    pub fn toggle_selected(&mut self, now: NaiveDateTime) {
        if let Some(id) = self.board.selected_id() {
            self.board.toggle_completed(id, now);
            self.save();
        }
    }

    pub fn delete_selected(&mut self) {
        if let Some(id) = self.board.selected_id() {
            self.board.delete(id);
            self.save();
        }
    }

    fn save(&mut self) {
        if let Err(err) = self.store.save(&self.board.to_records()) {
            tracing::error!(%err, "failed to save tasks");
            self.status = Some(format!("Failed to save tasks: {err}"));
        }
    }
}

pub fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    poll_timeout: Duration,
) -> io::Result<()> {
    app.startup_sweep(Local::now().naive_local());
    loop {
        let now = Local::now().naive_local();
        app.tick(now);
        terminal.draw(|f| draw(f, app, now))?;

        if !event::poll(poll_timeout)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        // An alert blocks everything else until dismissed.
        if app.popups.dismiss().is_some() {
            continue;
        }

        let now = Local::now().naive_local();
        app.status = None;
        match key.code {
            KeyCode::Char('q') => app.should_quit = true,
            KeyCode::Char('a') => {
                let answers = [
                    prompt("Enter task"),
                    prompt("Enter deadline date (YYYY-MM-DD)"),
                    prompt("Enter deadline time (H:MM)"),
                    prompt("Enter AM or PM"),
                ];
                if let [Some(text), Some(date), Some(time), Some(meridiem)] = answers {
                    if let Err(err) = app.add_task(&text, &date, &time, &meridiem, now) {
                        app.status = Some(format!(
                            "Please enter a task, deadline date, deadline time, and select AM/PM ({err})"
                        ));
                    }
                }
            }
            KeyCode::Char('e') => {
                if app.board.selected_id().is_some() {
                    let answers = [
                        prompt("Edit task (empty keeps current)"),
                        prompt("Edit deadline date (YYYY-MM-DD)"),
                        prompt("Edit deadline time (H:MM)"),
                        prompt("Edit AM/PM"),
                    ];
                    if let [Some(text), Some(date), Some(time), Some(meridiem)] = answers {
                        if let Err(err) = app.edit_selected(&text, &date, &time, &meridiem, now) {
                            app.status = Some(format!("Task not changed: {err}"));
                        }
                    }
                }
            }
            KeyCode::Char(' ') | KeyCode::Enter => app.toggle_selected(now),
            KeyCode::Char('d') | KeyCode::Delete => app.delete_selected(),
            KeyCode::Up => app.board.select_previous(),
            KeyCode::Down => app.board.select_next(),
            _ => {}
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

pub fn draw(f: &mut Frame, app: &App, now: NaiveDateTime) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(f.area());

    let items: Vec<ListItem> = app
        .board
        .records()
        .map(|record| {
            let (checkbox, style) = if record.completed {
                (
                    "[x] ",
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::CROSSED_OUT),
                )
            } else if deadline::evaluate(record, now).is_overdue {
                ("[ ] ", Style::default().fg(Color::Red))
            } else {
                ("[ ] ", Style::default().fg(Color::White))
            };
            ListItem::new(Line::from(vec![
                Span::raw(checkbox),
                Span::styled(record.display_line(), style),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().title("Tasks").borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected((!app.board.is_empty()).then_some(app.board.selected));
    f.render_stateful_widget(list, chunks[0], &mut state);

    let status = match &app.status {
        Some(message) => Span::styled(message.clone(), Style::default().fg(Color::Yellow)),
        None => Span::raw(format!(
            "{} delayed | a add  e edit  space done  d delete  q quit",
            app.board.overdue_count(now)
        )),
    };
    f.render_widget(Paragraph::new(Line::from(status)), chunks[1]);

    if let Some(message) = app.popups.current() {
        let area = centered_rect(60, 30, f.area());
        let popup = Paragraph::new(message.to_string())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title("Reminder")
                    .title_bottom("press any key")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red)),
            );
        f.render_widget(Clear, area);
        f.render_widget(popup, area);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn prompt(message: &str) -> Option<String> {
    disable_raw_mode().ok();
    println!("{}", message);
    let mut input = String::new();
    let answer = io::stdin()
        .read_line(&mut input)
        .ok()
        .map(|_| input.trim().to_string());
    enable_raw_mode().ok();
    answer
}
