// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Terminal viewer.
//!
//! Shows one workspace file at a time (ratatui + crossterm), turns mouse and keyboard gestures
//! into a line selection, commits it to the state store, and follows navigation commands written
//! by the assistant.

use std::{
    io,
    sync::Arc,
    time::{Duration, Instant},
};

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    style::Print,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};
use tracing::{info, warn};

use crate::capture::{source_lines, LineSelector};
use crate::navigation::{
    NavigationAgent, NavigationOutcome, NavigationViewer, NAVIGATION_POLL_INTERVAL,
};
use crate::store::StateStore;
use crate::workspace::{Workspace, WorkspaceError};

mod picker;

use picker::FilePicker;

const FOCUS_COLOR: Color = Color::LightGreen;
const FLASH_COLOR: Color = Color::Yellow;
const GUTTER_COLOR: Color = Color::DarkGray;
const FOOTER_LABEL_COLOR: Color = Color::Gray;
const FOOTER_KEY_COLOR: Color = Color::Cyan;

const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);
const FLASH_DURATION: Duration = Duration::from_millis(1500);
const TOAST_DURATION: Duration = Duration::from_secs(3);
const WHEEL_STEP: isize = 3;
const TAB_WIDTH: usize = 4;

/// Runs the terminal viewer until the user quits.
///
/// `initial_file` is a root-relative path; without one the file picker opens first.
pub fn run(
    store: Arc<StateStore>,
    workspace: Arc<Workspace>,
    initial_file: Option<String>,
    server_url: Option<String>,
) -> io::Result<()> {
    let mut terminal = TerminalSession::new()?;
    let mut app = App::new(store, workspace, server_url);
    app.start(initial_file.as_deref());
    let mut next_navigation_poll = Instant::now();

    while !app.should_quit {
        let now = Instant::now();
        if now >= next_navigation_poll {
            app.poll_navigation();
            next_navigation_poll = now + NAVIGATION_POLL_INTERVAL;
        }
        app.expire(now);
        terminal.draw(|frame| draw(frame, &mut app))?;

        if event::poll(Duration::from_millis(250))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key),
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                _ => {}
            }
        }
    }

    Ok(())
}

fn draw(frame: &mut Frame<'_>, app: &mut App) {
    let area = frame.size();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);
    let main_area = layout[0];
    let status_area = layout[1];

    render_file(frame, app, main_area);
    frame.render_widget(Paragraph::new(footer_line(app)), status_area);
    if let Some(picker) = &app.picker {
        render_picker(frame, picker, main_area);
    }
}

#[derive(Debug, Clone)]
struct OpenFile {
    /// Root-relative, `/`-separated.
    path: String,
    text: String,
    is_text: bool,
    size: u64,
}

impl OpenFile {
    fn lines(&self) -> Vec<&str> {
        source_lines(&self.text)
    }
}

#[derive(Debug, Clone)]
struct Toast {
    message: String,
    expires_at: Instant,
}

#[derive(Debug, Clone, Copy)]
struct Flash {
    line: usize,
    expires_at: Instant,
}

struct App {
    store: Arc<StateStore>,
    workspace: Arc<Workspace>,
    server_url: Option<String>,
    file: Option<OpenFile>,
    /// 1-based line under the keyboard cursor.
    cursor: usize,
    /// 0-based index of the first visible line.
    scroll: usize,
    /// Text area of the file view, inside its border.
    viewport: Rect,
    selector: LineSelector,
    last_click: Option<(usize, Instant)>,
    flash: Option<Flash>,
    toast: Option<Toast>,
    picker: Option<FilePicker>,
    navigation: NavigationAgent,
    should_quit: bool,
}

impl App {
    fn new(store: Arc<StateStore>, workspace: Arc<Workspace>, server_url: Option<String>) -> Self {
        Self {
            store,
            workspace,
            server_url,
            file: None,
            cursor: 1,
            scroll: 0,
            viewport: Rect::default(),
            selector: LineSelector::new(),
            last_click: None,
            flash: None,
            toast: None,
            picker: None,
            navigation: NavigationAgent::new(),
            should_quit: false,
        }
    }

    fn start(&mut self, initial_file: Option<&str>) {
        match initial_file {
            Some(path) => self.open_or_report(path),
            None => self.open_picker(),
        }
    }

    fn line_count(&self) -> usize {
        self.file.as_ref().map_or(0, |file| file.lines().len())
    }

    fn page_size(&self) -> usize {
        usize::from(self.viewport.height).max(1)
    }

    fn load_file(&mut self, path: &str) -> Result<(), WorkspaceError> {
        let content = self.workspace.read_file(path)?;
        info!(file = %content.path, size = content.size, "file opened");
        self.file = Some(OpenFile {
            path: content.path,
            text: content.content.unwrap_or_default(),
            is_text: content.is_text,
            size: content.size,
        });
        self.cursor = 1;
        self.scroll = 0;
        self.selector.clear();
        self.last_click = None;
        self.flash = None;
        Ok(())
    }

    fn open_or_report(&mut self, path: &str) {
        if let Err(err) = self.load_file(path) {
            self.set_toast(format!("Cannot open {path}: {err}"));
        }
    }

    fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
        self.follow_cursor();
    }

    fn clamp_scroll(&mut self) {
        let max_scroll = self.line_count().saturating_sub(self.page_size());
        self.scroll = self.scroll.min(max_scroll);
    }

    /// Scrolls just enough to keep the cursor inside the viewport.
    fn follow_cursor(&mut self) {
        let height = usize::from(self.viewport.height);
        if height > 0 {
            let index = self.cursor.saturating_sub(1);
            if index < self.scroll {
                self.scroll = index;
            } else if index >= self.scroll + height {
                self.scroll = index + 1 - height;
            }
        }
        self.clamp_scroll();
    }

    fn move_cursor_to(&mut self, line: usize) {
        let count = self.line_count();
        if count == 0 {
            return;
        }
        self.cursor = line.clamp(1, count);
        self.follow_cursor();
    }

    /// Moves the cursor; with `extend` the working set becomes anchor..=cursor.
    fn step_cursor(&mut self, delta: isize, extend: bool) {
        if self.line_count() == 0 {
            return;
        }
        if extend && self.selector.anchor().is_none() {
            self.selector.click(self.cursor, false);
        }
        self.move_cursor_to(self.cursor.saturating_add_signed(delta));
        if extend {
            self.selector.shift_click(self.cursor);
        }
    }

    /// Wheel scrolling drags the cursor along so it never leaves the screen.
    fn scroll_by(&mut self, delta: isize) {
        self.scroll = self.scroll.saturating_add_signed(delta);
        self.clamp_scroll();
        let first = self.scroll + 1;
        let last = self.scroll + self.page_size();
        if self.line_count() > 0 {
            self.cursor = self.cursor.clamp(first, last.min(self.line_count()));
        }
    }

    fn line_at(&self, column: u16, row: u16) -> Option<usize> {
        let area = self.viewport;
        let inside = column >= area.x
            && column < area.x.saturating_add(area.width)
            && row >= area.y
            && row < area.y.saturating_add(area.height);
        if !inside {
            return None;
        }
        let line = self.scroll + usize::from(row - area.y) + 1;
        (line <= self.line_count()).then_some(line)
    }

    /// Line under `row` while dragging: rows beyond the view scroll it and pin to its edge.
    fn drag_line_at(&mut self, row: u16) -> Option<usize> {
        let area = self.viewport;
        if area.height == 0 || self.line_count() == 0 {
            return None;
        }
        let bottom = area.y + area.height - 1;
        if row < area.y {
            self.scroll_by(-1);
        } else if row > bottom {
            self.scroll_by(1);
        }
        let row = row.clamp(area.y, bottom);
        let line = self.scroll + usize::from(row - area.y) + 1;
        Some(line.min(self.line_count()))
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if self.picker.is_some() {
            self.handle_picker_key(key);
            return;
        }

        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        let page = self.page_size() as isize;
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Down | KeyCode::Char('j') => self.step_cursor(1, shift),
            KeyCode::Up | KeyCode::Char('k') => self.step_cursor(-1, shift),
            KeyCode::Char('J') => self.step_cursor(1, true),
            KeyCode::Char('K') => self.step_cursor(-1, true),
            KeyCode::PageDown => self.step_cursor(page, shift),
            KeyCode::PageUp => self.step_cursor(-page, shift),
            KeyCode::Home | KeyCode::Char('g') => self.move_cursor_to(1),
            KeyCode::End | KeyCode::Char('G') => self.move_cursor_to(self.line_count()),
            KeyCode::Char(' ') if self.line_count() > 0 => self.selector.click(self.cursor, true),
            KeyCode::Char('v') if self.line_count() > 0 => self.selector.shift_click(self.cursor),
            KeyCode::Char('p') => self.expand_at_cursor(LineSelector::double_click),
            KeyCode::Char('i') => self.expand_at_cursor(LineSelector::alt_click),
            KeyCode::Enter => self.commit_selection(),
            KeyCode::Esc => self.selector.clear(),
            KeyCode::Char('/') | KeyCode::Char('o') => self.open_picker(),
            KeyCode::Char('y') => self.yank_selection(),
            _ => {}
        }
    }

    fn expand_at_cursor(&mut self, expand: fn(&mut LineSelector, &[&str], usize)) {
        let Some(file) = &self.file else {
            return;
        };
        let lines = file.lines();
        expand(&mut self.selector, &lines, self.cursor);
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        self.handle_mouse_at(mouse, Instant::now());
    }

    fn handle_mouse_at(&mut self, mouse: MouseEvent, now: Instant) {
        if self.picker.is_some() {
            return;
        }

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let Some(line) = self.line_at(mouse.column, mouse.row) else {
                    return;
                };
                self.cursor = line;
                let Some(file) = &self.file else {
                    return;
                };
                let lines = file.lines();
                let modifiers = mouse.modifiers;

                if modifiers.contains(KeyModifiers::ALT) {
                    self.selector.alt_click(&lines, line);
                } else if modifiers.contains(KeyModifiers::SHIFT) {
                    self.selector.shift_click(line);
                } else if modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::SUPER) {
                    self.selector.click(line, true);
                } else if self.last_click.is_some_and(|(previous, at)| {
                    previous == line && now.saturating_duration_since(at) <= DOUBLE_CLICK_WINDOW
                }) {
                    self.selector.double_click(&lines, line);
                    self.last_click = None;
                    return;
                } else {
                    self.selector.press(line);
                }
                self.last_click = Some((line, now));
            }
            MouseEventKind::Drag(MouseButton::Left) if self.selector.is_dragging() => {
                if let Some(line) = self.drag_line_at(mouse.row) {
                    self.cursor = line;
                    self.selector.drag_to(line);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => self.selector.release(),
            MouseEventKind::ScrollDown => self.scroll_by(WHEEL_STEP),
            MouseEventKind::ScrollUp => self.scroll_by(-WHEEL_STEP),
            _ => {}
        }
    }

    fn open_picker(&mut self) {
        self.picker = Some(FilePicker::new(self.workspace.walk_files()));
    }

    fn handle_picker_key(&mut self, key: KeyEvent) {
        let Some(picker) = self.picker.as_mut() else {
            return;
        };
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.picker = None,
            KeyCode::Enter => {
                let chosen = picker.selected().map(str::to_owned);
                self.picker = None;
                if let Some(path) = chosen {
                    self.open_or_report(&path);
                }
            }
            KeyCode::Down => picker.move_selection(1),
            KeyCode::Up => picker.move_selection(-1),
            KeyCode::Char('n') if control => picker.move_selection(1),
            KeyCode::Char('p') if control => picker.move_selection(-1),
            KeyCode::Char('c') if control => self.picker = None,
            KeyCode::Backspace => picker.pop(),
            KeyCode::Char(ch) if !control => picker.push(ch),
            _ => {}
        }
    }

    /// Sends the working set to the store as the shared selection.
    fn commit_selection(&mut self) {
        let message = match &self.file {
            None => "No file open".to_owned(),
            Some(file) => match self.selector.commit(&file.lines(), &file.path) {
                Err(err) => format!("Not sent: {err}"),
                Ok(commit) => match self.store.record_selection(commit) {
                    Ok(selection) => {
                        info!(
                            file = %selection.file_path,
                            range = %selection.range(),
                            "selection committed"
                        );
                        format!("Sent {} {} to the assistant", selection.file_path, selection.range())
                    }
                    Err(err) => {
                        warn!(error = %err, "selection commit failed");
                        format!("Not sent: {err}")
                    }
                },
            },
        };
        self.set_toast(message);
    }

    fn yank_selection(&mut self) {
        let Some(file) = &self.file else {
            self.set_toast("No file open");
            return;
        };
        let commit = match self.selector.commit(&file.lines(), &file.path) {
            Ok(commit) => commit,
            Err(err) => {
                self.set_toast(format!("Nothing copied: {err}"));
                return;
            }
        };
        let range = commit.range();
        match copy_to_clipboard(&commit.selected_text) {
            Ok(method) => self.set_toast(format!("Copied {range} ({method})")),
            Err(err) => self.set_toast(format!("Copy failed: {err}")),
        }
    }

    /// One navigation cycle; outcomes surface as toasts.
    fn poll_navigation(&mut self) {
        let store = Arc::clone(&self.store);
        let mut agent = std::mem::take(&mut self.navigation);
        let outcome = agent.poll(&store, self);
        self.navigation = agent;

        match outcome {
            Ok(NavigationOutcome::Idle) => {}
            Ok(NavigationOutcome::Executed { command, line }) => {
                self.set_toast(format!("Assistant: {} line {line}", command.file_path));
            }
            Ok(NavigationOutcome::TargetNotFound { command }) => {
                self.set_toast(format!(
                    "Assistant: {} target not found in {}",
                    command.command, command.file_path
                ));
            }
            Ok(NavigationOutcome::FileUnavailable { command, error }) => {
                self.set_toast(format!("Assistant: cannot open {}: {error}", command.file_path));
            }
            Ok(NavigationOutcome::Malformed { command }) => {
                self.set_toast(format!("Assistant: ignored malformed {} command", command.command));
            }
            Err(err) => {
                warn!(error = %err, "navigation poll failed");
                self.set_toast(format!("Navigation failed: {err}"));
            }
        }
    }

    fn expire(&mut self, now: Instant) {
        if self.toast.as_ref().is_some_and(|toast| now >= toast.expires_at) {
            self.toast = None;
        }
        if self.flash.is_some_and(|flash| now >= flash.expires_at) {
            self.flash = None;
        }
    }

    fn set_toast(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast {
            message: message.into(),
            expires_at: Instant::now() + TOAST_DURATION,
        });
    }

    fn flashed_line(&self) -> Option<usize> {
        self.flash.map(|flash| flash.line)
    }
}

impl NavigationViewer for App {
    fn current_file(&self) -> Option<&str> {
        self.file.as_ref().map(|file| file.path.as_str())
    }

    fn open_file(&mut self, file_path: &str) -> Result<(), WorkspaceError> {
        self.load_file(file_path)
    }

    fn current_lines(&self) -> Vec<&str> {
        self.file.as_ref().map(OpenFile::lines).unwrap_or_default()
    }

    fn reveal_line(&mut self, line: usize) {
        let count = self.line_count();
        if count == 0 {
            return;
        }
        let line = line.clamp(1, count);
        self.cursor = line;
        self.scroll = (line - 1).saturating_sub(usize::from(self.viewport.height) / 2);
        self.clamp_scroll();
        self.flash = Some(Flash {
            line,
            expires_at: Instant::now() + FLASH_DURATION,
        });
    }
}

include!("chrome.rs");

struct TerminalSession {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalSession {
    fn new() -> io::Result<Self> {
        enable_raw_mode()?;

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture).map_err(|err| {
            teardown_terminal();
            err
        })?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).map_err(|err| {
            teardown_terminal();
            err
        })?;
        terminal.clear().map_err(|err| {
            teardown_terminal();
            err
        })?;

        Ok(Self { terminal })
    }

    fn draw(&mut self, draw_fn: impl FnOnce(&mut Frame<'_>)) -> io::Result<()> {
        self.terminal.draw(draw_fn)?;
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
        teardown_terminal();
    }
}

fn teardown_terminal() {
    let _ = disable_raw_mode();
    let mut stdout = io::stdout();
    let _ = execute!(stdout, DisableMouseCapture, LeaveAlternateScreen);
}

fn copy_to_clipboard(text: &str) -> Result<&'static str, String> {
    let mut stdout = io::stdout();
    execute!(stdout, Print(osc52_sequence(text))).map_err(|err| err.to_string())?;
    Ok("osc52")
}

fn osc52_sequence(text: &str) -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    let encoded = STANDARD.encode(text.as_bytes());
    format!("\x1b]52;c;{encoded}\x1b\\")
}
