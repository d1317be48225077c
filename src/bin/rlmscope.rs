use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::widgets::Clear;
use rlmscope::app::{build_runtime, TuiMode};
use rlmscope::config::Config;
use rlmscope::logging;
use rlmscope::runtime::frontend::{FrontendAdapter, ScrollAction, UserInputEvent};
use rlmscope::runtime::mode::RuntimeMode;
use rlmscope::terminal::TerminalGuard;
use rlmscope::ui::layout::split_screen_layout;
use rlmscope::ui::render::{
    input_visual_rows, max_scroll_offset, render_input, render_notice, render_status_line,
    render_trajectory,
};
use std::time::Duration;

const MAX_INPUT_ROWS: usize = 6;

struct ManagedTuiFrontend {
    terminal: TerminalGuard,
    quit: bool,
    input_buffer: String,
    cursor: usize,
    body_rows: usize,
    max_offset: usize,
}

impl ManagedTuiFrontend {
    fn new() -> Result<Self> {
        let terminal = TerminalGuard::enter()?;
        Self::drain_startup_events();
        Ok(Self {
            terminal,
            quit: false,
            input_buffer: String::new(),
            cursor: 0,
            body_rows: 0,
            max_offset: 0,
        })
    }

    fn drain_startup_events() {
        for _ in 0..1024 {
            match event::poll(Duration::from_millis(0)) {
                Ok(true) => {
                    if event::read().is_err() {
                        break;
                    }
                }
                Ok(false) | Err(_) => break,
            }
        }
    }

    fn clamp_cursor_to_boundary_left(&self, mut idx: usize) -> usize {
        idx = idx.min(self.input_buffer.len());
        while idx > 0 && !self.input_buffer.is_char_boundary(idx) {
            idx -= 1;
        }
        idx
    }

    fn prev_char_boundary(&self, idx: usize) -> usize {
        let i = self.clamp_cursor_to_boundary_left(idx);
        self.input_buffer[..i]
            .char_indices()
            .next_back()
            .map_or(0, |(start, _)| start)
    }

    fn next_char_boundary(&self, idx: usize) -> usize {
        let i = self.clamp_cursor_to_boundary_left(idx);
        match self.input_buffer[i..].chars().next() {
            Some(ch) => i + ch.len_utf8(),
            None => self.input_buffer.len(),
        }
    }

    fn insert_str(&mut self, value: &str) {
        let cursor = self.clamp_cursor_to_boundary_left(self.cursor);
        self.input_buffer.insert_str(cursor, value);
        self.cursor = cursor + value.len();
    }

    fn backspace(&mut self) {
        let end = self.clamp_cursor_to_boundary_left(self.cursor);
        if end == 0 {
            return;
        }
        let start = self.prev_char_boundary(end);
        self.input_buffer.replace_range(start..end, "");
        self.cursor = start;
    }

    fn delete(&mut self) {
        let start = self.clamp_cursor_to_boundary_left(self.cursor);
        if start >= self.input_buffer.len() {
            return;
        }
        let end = self.next_char_boundary(start);
        self.input_buffer.replace_range(start..end, "");
        self.cursor = start;
    }

    fn submit_input(&mut self) -> Option<String> {
        let value = self.input_buffer.trim().to_string();
        self.input_buffer.clear();
        self.cursor = 0;
        (!value.is_empty()).then_some(value)
    }

    fn scroll(&self, action: ScrollAction) -> Option<UserInputEvent> {
        Some(UserInputEvent::Scroll {
            action,
            max_offset: self.max_offset,
        })
    }

    fn map_key(&mut self, key: KeyEvent) -> Option<UserInputEvent> {
        let page = self.body_rows.saturating_sub(1).max(1);
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(UserInputEvent::Interrupt)
            }
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                if self.input_buffer.is_empty() {
                    self.quit = true;
                }
                None
            }
            KeyCode::Char('j') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.insert_str("\n");
                None
            }
            KeyCode::Tab => Some(UserInputEvent::ToggleView),
            KeyCode::PageUp => self.scroll(ScrollAction::PageUp(page)),
            KeyCode::PageDown => self.scroll(ScrollAction::PageDown(page)),
            KeyCode::Up => self.scroll(ScrollAction::LineUp),
            KeyCode::Down => self.scroll(ScrollAction::LineDown),
            KeyCode::Home if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.scroll(ScrollAction::Home)
            }
            KeyCode::End if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.scroll(ScrollAction::End)
            }
            KeyCode::Home => {
                self.cursor = 0;
                None
            }
            KeyCode::End => {
                self.cursor = self.input_buffer.len();
                None
            }
            KeyCode::Left => {
                self.cursor = self.prev_char_boundary(self.cursor);
                None
            }
            KeyCode::Right => {
                self.cursor = self.next_char_boundary(self.cursor);
                None
            }
            KeyCode::Backspace => {
                self.backspace();
                None
            }
            KeyCode::Delete => {
                self.delete();
                None
            }
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {
                self.insert_str("\n");
                None
            }
            KeyCode::Enter => self.submit_input().map(UserInputEvent::Text),
            KeyCode::Char(ch)
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && !key.modifiers.contains(KeyModifiers::ALT) =>
            {
                self.insert_str(&ch.to_string());
                None
            }
            _ => None,
        }
    }
}

impl FrontendAdapter<TuiMode> for ManagedTuiFrontend {
    fn poll_user_input(&mut self, mode: &TuiMode) -> Option<UserInputEvent> {
        if mode.quit_requested() {
            self.quit = true;
            return None;
        }

        let Ok(has_event) = event::poll(Duration::from_millis(16)) else {
            self.quit = true;
            return None;
        };
        if !has_event {
            return None;
        }

        let Ok(ev) = event::read() else {
            self.quit = true;
            return None;
        };

        match ev {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.map_key(key),
            Event::Paste(text) => {
                self.insert_str(&text.replace("\r\n", "\n"));
                None
            }
            _ => None,
        }
    }

    fn render(&mut self, mode: &TuiMode) {
        let status = mode.status_line();
        let notice = mode.notice();
        let from_bottom = mode.scroll_from_bottom();
        let input = self.input_buffer.as_str();
        let cursor = self.cursor;
        let mut body_rows = self.body_rows;
        let mut max_offset = self.max_offset;

        let _ = self.terminal.draw(|frame| {
            let area = frame.area();
            frame.render_widget(Clear, area);
            let input_width = area.width.saturating_sub(2).max(1) as usize;
            let input_rows = input_visual_rows(input, input_width).min(MAX_INPUT_ROWS) as u16;
            let panes = split_screen_layout(area, input_rows);

            let lines = mode.body_lines(panes.trajectory.width as usize);
            body_rows = panes.trajectory.height as usize;
            max_offset = max_scroll_offset(lines.len(), body_rows);

            render_status_line(frame, panes.header, &status);
            render_trajectory(frame, panes.trajectory, lines, from_bottom);
            render_notice(frame, panes.notice, notice);
            render_input(frame, panes.input, input, cursor);
        });

        self.body_rows = body_rows;
        self.max_offset = max_offset;
    }

    fn should_quit(&self) -> bool {
        self.quit
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    config.validate()?;
    logging::init()?;
    tracing::info!(
        server = %config.server_url,
        stream = %config.stream_url,
        "rlmscope starting"
    );

    let (mut runtime, mut ctx) = build_runtime(config)?;
    let mut frontend = ManagedTuiFrontend::new()?;
    runtime.run(&mut frontend, &mut ctx).await;
    Ok(())
}
