//! Chart viewer state and TUI event loop.
//!
//! [`App`] owns the theme, the active [`RenderKind`] and the selected file.
//! Key handling is kept separate from the terminal so it can be driven in
//! tests without a TTY.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    text::{Line, Span},
    widgets::Paragraph,
    Frame, Terminal,
};

use eis_core::models::{ParsedExport, HEADER_SUMMARY_LINES};

use crate::charts::{self, RenderKind};
use crate::components::header_panel::HeaderPanel;
use crate::themes::Theme;

/// Title line, summary lines and the two border rows.
const HEADER_PANEL_HEIGHT: u16 = HEADER_SUMMARY_LINES as u16 + 3;

// ── App ───────────────────────────────────────────────────────────────────────

/// Root state of the chart viewer.
pub struct App {
    pub theme: Theme,
    pub kind: RenderKind,
    /// Index of the file shown by single-file kinds.
    pub selected: usize,
    pub show_header: bool,
    /// Set to `true` to break out of the event loop on the next iteration.
    pub should_quit: bool,
}

impl App {
    pub fn new(theme_name: &str, kind: RenderKind) -> Self {
        Self {
            theme: Theme::from_name(theme_name),
            kind,
            selected: 0,
            show_header: true,
            should_quit: false,
        }
    }

    /// Run the viewer over `exports` until `q`, `Q`, `Esc` or `Ctrl+C`.
    ///
    /// `Tab`/`Shift+Tab` cycle the chart kind, `←`/`→` select the file and
    /// `h` toggles the header panel.
    pub async fn run_charts(mut self, exports: Vec<ParsedExport>) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let tick_rate = Duration::from_millis(250);

        let result: io::Result<()> = loop {
            if let Err(e) = terminal.draw(|frame| self.render(frame, &exports)) {
                break Err(e);
            }

            match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key, exports.len());
                    }
                    Ok(_) => {}
                    Err(e) => break Err(e),
                },
                Ok(false) => {}
                Err(e) => break Err(e),
            }

            if self.should_quit {
                break Ok(());
            }
        };

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    /// Apply one key press. `file_count` bounds the file selection.
    pub fn handle_key(&mut self, key: KeyEvent, file_count: usize) {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.kind = self.kind.next(),
            KeyCode::BackTab => self.kind = self.kind.prev(),
            KeyCode::Right if file_count > 0 => {
                self.selected = (self.selected + 1) % file_count;
            }
            KeyCode::Left if file_count > 0 => {
                self.selected = (self.selected + file_count - 1) % file_count;
            }
            KeyCode::Char('h') => self.show_header = !self.show_header,
            _ => {}
        }
    }

    /// Render the current state into `frame`.
    pub fn render(&self, frame: &mut Frame, exports: &[ParsedExport]) {
        let area = frame.area();
        let selected = exports.get(self.selected).or_else(|| exports.first());

        let header_height = match selected {
            Some(_) if self.show_header && !self.kind.is_multi_file() => HEADER_PANEL_HEIGHT,
            _ => 0,
        };

        let [header_area, chart_area, footer_area] = Layout::vertical([
            Constraint::Length(header_height),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .areas(area);

        if let (Some(export), true) = (selected, header_height > 0) {
            HeaderPanel::new(export, &self.theme).render(frame, header_area);
        }

        charts::render_chart(
            frame,
            chart_area,
            self.kind,
            exports,
            self.selected,
            &self.theme,
        );

        frame.render_widget(Paragraph::new(self.footer(exports.len())), footer_area);
    }

    fn footer(&self, file_count: usize) -> Line<'static> {
        let position = if file_count == 0 {
            "no files".to_string()
        } else {
            format!("file {}/{}", self.selected.min(file_count - 1) + 1, file_count)
        };
        Line::from(vec![
            Span::styled(format!(" {} ", self.kind.as_str()), self.theme.value),
            Span::styled(format!("| {position} "), self.theme.label),
            Span::styled(
                "| Tab: chart  ←/→: file  h: header  q: quit",
                self.theme.footer,
            ),
        ])
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
