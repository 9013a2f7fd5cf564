use eis_core::models::ParsedExport;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::themes::Theme;

/// Panel describing the selected export:
///
/// 1. File name, acquisition time and point count.
/// 2. The header summary, one preamble line per row, clipped to the panel width.
pub struct HeaderPanel<'a> {
    pub export: &'a ParsedExport,
    pub theme: &'a Theme,
}

impl<'a> HeaderPanel<'a> {
    pub fn new(export: &'a ParsedExport, theme: &'a Theme) -> Self {
        Self { export, theme }
    }

    /// Build the panel lines for a content area `width` columns wide.
    pub fn to_lines(&self, width: usize) -> Vec<Line<'a>> {
        let acquired = self
            .export
            .info
            .acquired_at
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown time".to_string());

        let mut lines = vec![Line::from(vec![
            Span::styled(self.export.display_name(), self.theme.value),
            Span::styled(" | ", self.theme.dim),
            Span::styled(acquired, self.theme.label),
            Span::styled(" | ", self.theme.dim),
            Span::styled(
                format!("{} points", self.export.table.len()),
                self.theme.label,
            ),
        ])];

        for raw in self.export.header.summary().lines() {
            lines.push(Line::from(Span::styled(
                truncate_to_width(raw, width),
                self.theme.text,
            )));
        }
        lines
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let inner_width = area.width.saturating_sub(2) as usize;
        let paragraph = Paragraph::new(self.to_lines(inner_width)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(self.theme.border)
                .title(Span::styled(" Header ", self.theme.title)),
        );
        frame.render_widget(paragraph, area);
    }
}

/// Clip `text` to at most `width` display columns, marking the cut with `…`.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }

    let budget = width - 1;
    let mut used = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
