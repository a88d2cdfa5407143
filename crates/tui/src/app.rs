use std::{io, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::Local;
use censordle_core::{
    session::SelectionResult, AdvisoryEntry, GameError, GameSession, LossReason, Outcome,
    SessionController, SessionStatus, Severity,
};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::{spawn, sync::mpsc, task::spawn_blocking};
use tracing::{debug, error, info, warn};

use crate::block_font;

const TICK_RATE: Duration = Duration::from_millis(250);
const MAX_GUESS_LEN: usize = 120;
const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];
const BANNER_TEXT: &str = "CENSORDLE";

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    selection_fg: Color,
    success: Color,
    warning: Color,
    danger: Color,
    on_accent: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            selection_fg: Color::White,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
            on_accent: Color::Black,
        }
    }
}

/// Badge colour for an advisory severity.
fn severity_color(severity: &Severity) -> Color {
    match severity {
        Severity::None => Color::Green,
        Severity::Mild => Color::Yellow,
        Severity::Moderate => Color::LightRed,
        Severity::Severe => Color::Red,
        Severity::Unknown | Severity::Other(_) => Color::Gray,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Screen {
    Loading,
    Play,
    Failed(String),
}

enum AppEvent {
    Input(Event),
    Tick,
    MovieSelected(SelectionResult),
    SelectionAborted { generation: u64, reason: String },
}

/// Single-line text box for the guess, cursor tracked as a byte offset.
#[derive(Debug, Clone, Default)]
struct GuessInput {
    text: String,
    cursor: usize,
}

impl GuessInput {
    fn value(&self) -> &str {
        &self.text
    }

    fn set(&mut self, value: &str) {
        self.text = value.to_string();
        self.cursor = self.text.len();
    }

    fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    fn insert(&mut self, ch: char) {
        if ch.is_control() || self.text.chars().count() >= MAX_GUESS_LEN {
            return;
        }
        self.text.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn backspace(&mut self) {
        if let Some(ch) = self.text[..self.cursor].chars().next_back() {
            self.cursor -= ch.len_utf8();
            self.text.remove(self.cursor);
        }
    }

    fn delete(&mut self) {
        if self.cursor < self.text.len() {
            self.text.remove(self.cursor);
        }
    }

    fn move_left(&mut self) {
        if let Some(ch) = self.text[..self.cursor].chars().next_back() {
            self.cursor -= ch.len_utf8();
        }
    }

    fn move_right(&mut self) {
        if let Some(ch) = self.text[self.cursor..].chars().next() {
            self.cursor += ch.len_utf8();
        }
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.text.len();
    }

    /// Text split around the cursor: before, the character under it, after.
    fn split(&self) -> (&str, &str, &str) {
        let (before, rest) = self.text.split_at(self.cursor);
        let width = rest.chars().next().map(char::len_utf8).unwrap_or(0);
        let (at, after) = rest.split_at(width);
        (before, at, after)
    }
}

/// Autocomplete list with an optional highlighted row.
#[derive(Debug, Clone, Default)]
struct Suggestions {
    items: Vec<String>,
    cursor: Option<usize>,
}

impl Suggestions {
    fn replace(&mut self, items: Vec<String>) {
        self.items = items;
        self.cursor = None;
    }

    fn clear(&mut self) {
        self.replace(Vec::new());
    }

    fn move_cursor(&mut self, delta: isize) {
        if self.items.is_empty() {
            self.cursor = None;
            return;
        }
        let len = self.items.len() as isize;
        let next = match self.cursor {
            Some(current) => (current as isize + delta).rem_euclid(len),
            None if delta < 0 => len - 1,
            None => 0,
        };
        self.cursor = Some(next as usize);
    }

    fn selected(&self) -> Option<&str> {
        self.cursor
            .and_then(|index| self.items.get(index))
            .map(String::as_str)
    }
}

/// Terminal front end driving a [`SessionController`].
pub struct CensordleApp {
    controller: SessionController,
    screen: Screen,
    input: GuessInput,
    suggestions: Suggestions,
    status: String,
    spinner: usize,
    event_tx: Option<mpsc::Sender<AppEvent>>,
    theme: Theme,
    should_quit: bool,
}

impl CensordleApp {
    pub fn new(controller: SessionController) -> Self {
        Self {
            controller,
            screen: Screen::Loading,
            input: GuessInput::default(),
            suggestions: Suggestions::default(),
            status: String::new(),
            spinner: 0,
            event_tx: None,
            theme: Theme::default(),
            should_quit: false,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);
        self.start_selection();

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) || self.should_quit {
                break;
            }
        }

        self.controller.cancel_selection();
        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        info!("censordle exited");
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(Event::Key(key))) => {
                if let Err(err) = self.handle_key(key) {
                    error!(?err, "key handling failed");
                    self.status = format!("Error: {err}");
                }
                true
            }
            Some(AppEvent::Input(_)) => true,
            Some(AppEvent::Tick) => {
                if self.screen == Screen::Loading {
                    self.spinner = (self.spinner + 1) % SPINNER.len();
                }
                true
            }
            Some(AppEvent::MovieSelected(result)) => {
                self.finish_selection(result);
                true
            }
            Some(AppEvent::SelectionAborted { generation, reason }) => {
                if generation == self.controller.generation() {
                    error!(%reason, "selection worker aborted");
                    self.screen = Screen::Failed(reason);
                }
                true
            }
            None => false,
        }
    }

    /// Kick off a background selection; any earlier one in flight is superseded.
    fn start_selection(&mut self) {
        let Some(sender) = self.event_tx.clone() else {
            error!("event_channel_missing");
            self.status = "Internal error: event channel unavailable".to_string();
            return;
        };

        let request = self.controller.begin_selection();
        let generation = request.generation();
        self.screen = Screen::Loading;
        self.input.clear();
        self.suggestions.clear();
        self.status = "Picking a movie…".to_string();
        info!(generation, "new game requested");

        spawn(async move {
            let event = match spawn_blocking(move || request.run()).await {
                Ok(result) => AppEvent::MovieSelected(result),
                Err(err) => AppEvent::SelectionAborted {
                    generation,
                    reason: err.to_string(),
                },
            };
            let _ = sender.send(event).await;
        });
    }

    fn finish_selection(&mut self, result: SelectionResult) {
        let generation = result.generation();
        match self.controller.complete_selection(result) {
            Ok(true) => self.enter_play(),
            Ok(false) => debug!(generation, "ignored superseded selection"),
            Err(err) => {
                self.status = selection_failure_message(&err);
                self.screen = Screen::Failed(err.to_string());
            }
        }
    }

    fn enter_play(&mut self) {
        self.screen = Screen::Play;
        self.input.clear();
        self.suggestions.clear();
        self.status = match self.controller.session() {
            Some(session) => format!(
                "Guess the movie from its parental guide. {} hints in this one.",
                session.total_hints()
            ),
            None => String::new(),
        };
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.kind == KeyEventKind::Release {
            return Ok(());
        }
        if key.code == KeyCode::Esc
            || (key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c'))
        {
            self.should_quit = true;
            return Ok(());
        }
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('n') {
            self.start_selection();
            return Ok(());
        }

        match self.screen.clone() {
            Screen::Loading => Ok(()),
            Screen::Failed(_) => {
                match key.code {
                    KeyCode::Char('r') | KeyCode::Enter => self.start_selection(),
                    KeyCode::Char('q') => self.should_quit = true,
                    _ => {}
                }
                Ok(())
            }
            Screen::Play => self.handle_play_key(key),
        }
    }

    fn handle_play_key(&mut self, key: KeyEvent) -> Result<()> {
        let finished = self
            .controller
            .session()
            .map(GameSession::is_finished)
            .unwrap_or(true);
        if finished {
            match key.code {
                KeyCode::Enter | KeyCode::Char('n') => self.start_selection(),
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            }
            return Ok(());
        }

        if key.modifiers == KeyModifiers::CONTROL {
            if let KeyCode::Char('g') = key.code {
                self.give_up();
            }
            return Ok(());
        }

        match key.code {
            KeyCode::Enter => self.submit_guess(),
            KeyCode::Tab => self.reveal_hint(),
            KeyCode::Up => self.suggestions.move_cursor(-1),
            KeyCode::Down => self.suggestions.move_cursor(1),
            KeyCode::Left => self.input.move_left(),
            KeyCode::Right => self.input.move_right(),
            KeyCode::Home => self.input.move_home(),
            KeyCode::End => self.input.move_end(),
            KeyCode::Backspace => {
                self.input.backspace();
                self.refresh_suggestions();
            }
            KeyCode::Delete => {
                self.input.delete();
                self.refresh_suggestions();
            }
            KeyCode::Char(ch) => {
                self.input.insert(ch);
                self.refresh_suggestions();
            }
            _ => {}
        }
        Ok(())
    }

    fn refresh_suggestions(&mut self) {
        let items = self
            .controller
            .session()
            .map(|session| session.suggest_titles(self.input.value()))
            .unwrap_or_default();
        self.suggestions.replace(items);
    }

    fn submit_guess(&mut self) {
        let guess = match self.suggestions.selected() {
            Some(choice) => choice.to_string(),
            None => self.input.value().to_string(),
        };
        let Some(session) = self.controller.session_mut() else {
            return;
        };

        match session.submit_guess(&guess) {
            Ok(outcome) => {
                info!(guess = %guess.trim(), ?outcome, "guess accepted");
                self.status = session
                    .feedback_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| describe_outcome(outcome));
                self.input.clear();
                self.suggestions.clear();
            }
            Err(GameError::InvalidGuess(rejection)) => {
                debug!(guess = %guess, %rejection, "guess rejected");
                self.status = rejection.feedback().to_string();
                if self.suggestions.selected().is_some() {
                    self.input.set(&guess);
                    self.suggestions.cursor = None;
                }
            }
            Err(err) => {
                warn!(%err, "guess not applied");
                self.status = err.to_string();
            }
        }
    }

    fn reveal_hint(&mut self) {
        let Some(session) = self.controller.session_mut() else {
            return;
        };
        if session.remaining_hints() == 0 {
            self.status = "No more hints. Make a guess or give up.".to_string();
            return;
        }
        match session.reveal_next_hint() {
            Ok(outcome) => {
                self.status = session
                    .feedback_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| describe_outcome(outcome));
            }
            Err(err) => self.status = err.to_string(),
        }
    }

    fn give_up(&mut self) {
        let Some(session) = self.controller.session_mut() else {
            return;
        };
        match session.give_up() {
            Ok(outcome) => {
                info!(title = %session.movie().display_key(), "player gave up");
                self.status = session
                    .feedback_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| describe_outcome(outcome));
                self.input.clear();
                self.suggestions.clear();
            }
            Err(err) => self.status = err.to_string(),
        }
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.size();
        let banner_lines = block_font::render_within(BANNER_TEXT, area.width as usize)
            .unwrap_or_else(|| vec![BANNER_TEXT.to_string()]);
        let banner_height = banner_lines.len() as u16 + 1;
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(banner_height.min(area.height / 3)),
                Constraint::Min(6),
                Constraint::Length(4),
            ])
            .split(area);

        self.render_banner(frame, layout[0], &banner_lines);
        match &self.screen {
            Screen::Loading => self.render_loading(frame, layout[1]),
            Screen::Failed(reason) => self.render_failure(frame, layout[1], reason),
            Screen::Play => match self.controller.session() {
                Some(session) => self.draw_play(frame, layout[1], session),
                None => self.render_loading(frame, layout[1]),
            },
        }
        self.render_status(frame, layout[2]);
    }

    fn render_banner(&self, frame: &mut Frame, area: Rect, lines: &[String]) {
        let content: Vec<Line> = lines
            .iter()
            .map(|line| {
                Line::from(Span::styled(
                    line.clone(),
                    Style::default()
                        .fg(self.theme.accent)
                        .add_modifier(Modifier::BOLD),
                ))
            })
            .collect();
        frame.render_widget(Paragraph::new(content).alignment(Alignment::Center), area);
    }

    fn render_loading(&self, frame: &mut Frame, area: Rect) {
        let message = format!("{} Picking a movie…", SPINNER[self.spinner]);
        let box_area = centered_rect(36, 3, area);
        let paragraph = Paragraph::new(Line::from(Span::styled(
            message,
            Style::default().fg(self.theme.primary_fg),
        )))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(paragraph, box_area);
    }

    fn render_failure(&self, frame: &mut Frame, area: Rect, reason: &str) {
        let box_area = centered_rect(64, 7, area);
        let lines = vec![
            Line::from(Span::styled(
                "Could not start a game",
                Style::default()
                    .fg(self.theme.danger)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(reason.to_string()),
            Line::from(""),
            Line::from(Span::styled(
                "r retry   q quit",
                Style::default().fg(self.theme.muted),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Error"));
        frame.render_widget(Clear, box_area);
        frame.render_widget(paragraph, box_area);
    }

    fn draw_play(&self, frame: &mut Frame, area: Rect, session: &GameSession) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);
        self.render_hints(frame, columns[0], session);

        let suggestion_rows = self.suggestions.items.len().max(1) as u16 + 2;
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(suggestion_rows),
                Constraint::Min(3),
            ])
            .split(columns[1]);
        self.render_input(frame, right[0], session);
        self.render_suggestions(frame, right[1]);
        self.render_previous_guesses(frame, right[2], session);

        if session.is_finished() {
            self.render_result(frame, area, session);
        }
    }

    fn render_hints(&self, frame: &mut Frame, area: Rect, session: &GameSession) {
        let title = format!(
            "Hints {}/{}",
            session.revealed_count(),
            session.total_hints()
        );
        let mut lines = Vec::new();
        for (index, entry) in session.revealed_entries().iter().enumerate() {
            if index > 0 {
                lines.push(Line::from(""));
            }
            lines.extend(self.entry_lines(entry, false));
        }
        if session.is_finished() {
            let hidden = &session.movie().parental_guide_entries[session.revealed_count()..];
            for entry in hidden {
                lines.push(Line::from(""));
                lines.extend(self.entry_lines(entry, true));
            }
        }

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn entry_lines(&self, entry: &AdvisoryEntry, dimmed: bool) -> Vec<Line<'static>> {
        let severity = entry.severity_level();
        let badge = Style::default()
            .fg(self.theme.on_accent)
            .bg(severity_color(&severity))
            .add_modifier(Modifier::BOLD);
        let text = if dimmed {
            Style::default().fg(self.theme.muted)
        } else {
            Style::default().fg(self.theme.primary_fg)
        };
        vec![
            Line::from(vec![
                Span::styled(format!(" {} ", entry.category), badge),
                Span::raw(" "),
                Span::styled(severity.to_string(), Style::default().fg(severity_color(&severity))),
            ]),
            Line::from(Span::styled(entry.description.clone(), text)),
        ]
    }

    fn render_input(&self, frame: &mut Frame, area: Rect, session: &GameSession) {
        let (before, at, after) = self.input.split();
        let cursor_style = Style::default()
            .fg(self.theme.selection_fg)
            .bg(self.theme.selection_bg);
        let line = if session.is_finished() {
            Line::from(Span::styled(
                "Game finished",
                Style::default().fg(self.theme.muted),
            ))
        } else if self.input.value().is_empty() {
            Line::from(vec![
                Span::styled(" ", cursor_style),
                Span::styled(
                    "Type a movie title…",
                    Style::default().fg(self.theme.muted),
                ),
            ])
        } else {
            Line::from(vec![
                Span::raw(before.to_string()),
                Span::styled(
                    if at.is_empty() { " ".to_string() } else { at.to_string() },
                    cursor_style,
                ),
                Span::raw(after.to_string()),
            ])
        };
        let paragraph =
            Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("Guess"));
        frame.render_widget(paragraph, area);
    }

    fn render_suggestions(&self, frame: &mut Frame, area: Rect) {
        let lines: Vec<Line> = if self.suggestions.items.is_empty() {
            vec![Line::from(Span::styled(
                "No suggestions",
                Style::default().fg(self.theme.muted),
            ))]
        } else {
            self.suggestions
                .items
                .iter()
                .enumerate()
                .map(|(index, title)| {
                    if Some(index) == self.suggestions.cursor {
                        Line::from(Span::styled(
                            format!("▶ {title}"),
                            Style::default()
                                .fg(self.theme.accent)
                                .add_modifier(Modifier::BOLD),
                        ))
                    } else {
                        Line::from(format!("  {title}"))
                    }
                })
                .collect()
        };
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Suggestions"));
        frame.render_widget(paragraph, area);
    }

    fn render_previous_guesses(&self, frame: &mut Frame, area: Rect, session: &GameSession) {
        let lines: Vec<Line> = session
            .previous_guesses()
            .iter()
            .map(|guess| {
                Line::from(Span::styled(
                    format!("✗ {guess}"),
                    Style::default().fg(self.theme.danger),
                ))
            })
            .collect();
        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Previous guesses"),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_result(&self, frame: &mut Frame, area: Rect, session: &GameSession) {
        let movie = session.movie();
        let (headline, color) = match (session.status(), session.loss_reason()) {
            (SessionStatus::Won, _) => ("You got it!", self.theme.success),
            (_, Some(LossReason::GaveUp)) => ("You gave up", self.theme.warning),
            _ => ("Out of hints", self.theme.danger),
        };

        let width = area.width.saturating_sub(4).min(96);
        let mut lines = vec![Line::from(Span::styled(
            headline,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))];
        match block_font::render_within(&movie.title, width.saturating_sub(2) as usize) {
            Some(title_lines) => lines.extend(title_lines.into_iter().map(|line| {
                Line::from(Span::styled(line, Style::default().fg(self.theme.accent)))
            })),
            None => lines.push(Line::from(Span::styled(
                movie.title.clone(),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ))),
        }
        lines.push(Line::from(format!("Released {}", movie.year)));
        if let Some(director) = &movie.director {
            lines.push(Line::from(format!("Directed by {director}")));
        }
        lines.push(Line::from(Span::styled(
            movie.imdb_url(),
            Style::default().add_modifier(Modifier::UNDERLINED),
        )));
        lines.push(Line::from(format!(
            "{} wrong guesses, {} of {} hints used",
            session.previous_guesses().len(),
            session.revealed_count(),
            session.total_hints()
        )));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Enter new game   q quit",
            Style::default().fg(self.theme.muted),
        )));

        let height = (lines.len() as u16 + 2).min(area.height);
        let popup = centered_rect(width, height, area);
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Result"));
        frame.render_widget(Clear, popup);
        frame.render_widget(paragraph, popup);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let help = match (&self.screen, self.controller.session()) {
            (Screen::Play, Some(session)) if !session.is_finished() => {
                let hint_key = if session.remaining_hints() > 0 {
                    format!("Tab next hint ({} left)", session.remaining_hints())
                } else {
                    "no hints left".to_string()
                };
                let started = session.started_at().with_timezone(&Local).format("%H:%M");
                format!(
                    "Enter guess  ↑/↓ pick  {hint_key}  Ctrl-G give up  Ctrl-N new  Esc quit  \
                     (started {started})"
                )
            }
            (Screen::Loading, _) => "Esc quit".to_string(),
            _ => "Ctrl-N new game  Esc quit".to_string(),
        };
        let paragraph = Paragraph::new(vec![
            Line::from(self.status.clone()),
            Line::from(Span::styled(help, Style::default().fg(self.theme.muted))),
        ])
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn describe_outcome(outcome: Outcome) -> String {
    match outcome {
        Outcome::HintRevealed { remaining, .. } => format!("You have {remaining} more hints."),
        Outcome::Won => "You guessed correctly!".to_string(),
        Outcome::Lost(LossReason::GaveUp) => "You gave up.".to_string(),
        Outcome::Lost(LossReason::OutOfHints) => "Out of hints.".to_string(),
    }
}

fn selection_failure_message(err: &GameError) -> String {
    match err {
        GameError::NoEligibleMovie { .. } => {
            "No playable movie found. Publish more movies and retry.".to_string()
        }
        GameError::DataUnavailable(_) => {
            "Movie data is unavailable. Check the store and retry.".to_string()
        }
        other => other.to_string(),
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use censordle_core::{
        store::{METADATA_COLLECTION, MOVIES_COLLECTION, TITLE_MAPPING_KEY},
        DocumentStore, MemoryStore, Movie,
    };
    use std::sync::Arc;

    fn movie(title: &str, year: u16, entries: usize) -> Movie {
        Movie {
            imdb_id: format!("tt{year}"),
            title: title.to_string(),
            year,
            director: Some("Someone".to_string()),
            parental_guide_entries: (1..=entries)
                .map(|n| AdvisoryEntry::new("Violence & Gore", "Moderate", format!("Hint {n}.")))
                .collect(),
        }
    }

    fn app_with_game() -> Result<CensordleApp> {
        let store = MemoryStore::new();
        for (key, movie) in [
            ("Alien_1979_tt1979", movie("Alien", 1979, 3)),
            ("Up_2009_tt2009", movie("Up", 2009, 1)),
        ] {
            store.put_document(MOVIES_COLLECTION, key, &serde_json::to_value(movie)?)?;
        }
        store.put_document(
            METADATA_COLLECTION,
            TITLE_MAPPING_KEY,
            &serde_json::json!({
                "Alien (1979)": "Alien_1979_tt1979",
                "Up (2009)": "Up_2009_tt2009",
            }),
        )?;

        let mut controller = SessionController::new(Arc::new(store), 50);
        controller.new_session()?;
        let mut app = CensordleApp::new(controller);
        app.enter_play();
        Ok(app)
    }

    fn press(app: &mut CensordleApp, code: KeyCode) -> Result<()> {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut CensordleApp, text: &str) -> Result<()> {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch))?;
        }
        Ok(())
    }

    fn session(app: &CensordleApp) -> Result<&GameSession> {
        app.controller
            .session()
            .ok_or_else(|| anyhow!("no session"))
    }

    #[test]
    fn guess_input_edits_around_cursor() {
        let mut input = GuessInput::default();
        for ch in "Amélie".chars() {
            input.insert(ch);
        }
        input.move_left();
        input.move_left();
        input.move_left();
        input.backspace();
        assert_eq!(input.value(), "Amlie");
        input.insert('é');
        input.move_home();
        input.delete();
        assert_eq!(input.value(), "mélie");
        assert_eq!(input.split(), ("", "m", "élie"));
        input.move_end();
        input.insert('\n');
        assert_eq!(input.value(), "mélie");
        assert_eq!(input.split(), ("mélie", "", ""));
    }

    #[test]
    fn suggestion_cursor_wraps() {
        let mut suggestions = Suggestions::default();
        suggestions.move_cursor(1);
        assert_eq!(suggestions.selected(), None);

        suggestions.replace(vec!["A (1)".into(), "B (2)".into()]);
        suggestions.move_cursor(-1);
        assert_eq!(suggestions.selected(), Some("B (2)"));
        suggestions.move_cursor(1);
        assert_eq!(suggestions.selected(), Some("A (1)"));
        suggestions.move_cursor(1);
        suggestions.move_cursor(1);
        assert_eq!(suggestions.selected(), Some("A (1)"));
    }

    #[test]
    fn severity_colors() {
        assert_eq!(severity_color(&Severity::Severe), Color::Red);
        assert_eq!(severity_color(&Severity::None), Color::Green);
        assert_eq!(severity_color(&Severity::Other("Extreme".into())), Color::Gray);
    }

    #[test]
    fn picking_a_suggestion_submits_it() -> Result<()> {
        let mut app = app_with_game()?;
        type_text(&mut app, "up")?;
        assert_eq!(app.suggestions.items, vec!["Up (2009)".to_string()]);

        press(&mut app, KeyCode::Down)?;
        press(&mut app, KeyCode::Enter)?;
        let session = session(&app)?;
        assert_eq!(session.previous_guesses(), ["Up (2009)".to_string()]);
        assert_eq!(session.revealed_count(), 2);
        assert!(app.input.value().is_empty());
        assert_eq!(app.status, "You have 1 more hints.");
        Ok(())
    }

    #[test]
    fn unknown_guess_keeps_input_and_explains() -> Result<()> {
        let mut app = app_with_game()?;
        type_text(&mut app, "Aliens")?;
        press(&mut app, KeyCode::Enter)?;
        assert_eq!(app.status, "Please select a movie from the suggestions.");
        assert_eq!(app.input.value(), "Aliens");
        assert_eq!(session(&app)?.revealed_count(), 1);
        Ok(())
    }

    #[test]
    fn tab_reveals_and_ctrl_g_gives_up() -> Result<()> {
        let mut app = app_with_game()?;
        press(&mut app, KeyCode::Tab)?;
        press(&mut app, KeyCode::Tab)?;
        assert_eq!(session(&app)?.remaining_hints(), 0);
        press(&mut app, KeyCode::Tab)?;
        assert_eq!(app.status, "No more hints. Make a guess or give up.");

        app.handle_key(KeyEvent::new(KeyCode::Char('g'), KeyModifiers::CONTROL))?;
        let session = session(&app)?;
        assert_eq!(session.status(), SessionStatus::Lost);
        assert_eq!(session.loss_reason(), Some(LossReason::GaveUp));
        assert_eq!(app.status, "Game over. It was Alien.");
        Ok(())
    }

    #[test]
    fn finished_game_ignores_typing() -> Result<()> {
        let mut app = app_with_game()?;
        type_text(&mut app, "Alien (1979)")?;
        press(&mut app, KeyCode::Enter)?;
        assert_eq!(session(&app)?.status(), SessionStatus::Won);

        type_text(&mut app, "zzz")?;
        assert!(app.input.value().is_empty());
        assert!(!app.should_quit);
        press(&mut app, KeyCode::Char('q'))?;
        assert!(app.should_quit);
        Ok(())
    }

    #[test]
    fn superseded_selection_is_ignored() -> Result<()> {
        let mut app = app_with_game()?;
        let stale = app.controller.begin_selection();
        let _fresh = app.controller.begin_selection();
        let before = session(&app)?.started_at();
        app.finish_selection(stale.run());
        assert_eq!(app.screen, Screen::Play);
        assert_eq!(session(&app)?.started_at(), before);
        Ok(())
    }
}
