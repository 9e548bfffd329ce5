use crate::types::{LogLine, Tier};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};
use regex::Regex;

pub fn tier_style(tier: Tier) -> Style {
    match tier {
        Tier::Error => Style::default().fg(Color::White).bg(Color::Red),
        Tier::Warning => Style::default().fg(Color::Yellow),
        Tier::Normal => Style::default(),
    }
}

pub struct LogView<'a> {
    logs: Vec<&'a LogLine>,
    scroll_offset: usize,
    search: Option<&'a Regex>,
}

impl<'a> LogView<'a> {
    pub fn new(logs: Vec<&'a LogLine>, scroll_offset: usize, search: Option<&'a Regex>) -> Self {
        Self {
            logs,
            scroll_offset,
            search,
        }
    }

    /// Split `text` into spans, highlighting search matches.
    fn highlight(&self, text: &'a str, base: Style, spans: &mut Vec<Span<'a>>) {
        let Some(regex) = self.search else {
            spans.push(Span::styled(text, base));
            return;
        };
        let mut last_end = 0;
        for mat in regex.find_iter(text) {
            if mat.start() > last_end {
                spans.push(Span::styled(&text[last_end..mat.start()], base));
            }
            spans.push(Span::styled(
                mat.as_str(),
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ));
            last_end = mat.end();
        }
        if last_end < text.len() {
            spans.push(Span::styled(&text[last_end..], base));
        }
    }

    fn format_log_line(&self, line: &'a LogLine) -> Line<'a> {
        let base = tier_style(line.tier());
        let mut spans = Vec::new();

        match line.display_fields() {
            Some(fields) => {
                if let Some(level) = fields.level {
                    let level_style = if fields.is_info() {
                        base.fg(Color::Green).add_modifier(Modifier::BOLD)
                    } else {
                        base.add_modifier(Modifier::BOLD)
                    };
                    spans.push(Span::styled(level, level_style));
                    spans.push(Span::styled(" ", base));
                }
                if let Some(time) = fields.time {
                    spans.push(Span::styled(time, base.fg(Color::DarkGray)));
                    spans.push(Span::styled(" ", base));
                }
                self.highlight(fields.message, base, &mut spans);
            }
            None => self.highlight(&line.raw, base, &mut spans),
        }

        Line::from(spans).style(base)
    }
}

impl<'a> Widget for LogView<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // One row per logical line, so the offset indexes lines directly.
        let lines: Vec<Line> = self
            .logs
            .iter()
            .skip(self.scroll_offset)
            .take(area.height as usize)
            .map(|line| self.format_log_line(line))
            .collect();

        Paragraph::new(lines).render(area, buf);
    }
}

pub struct Header<'a> {
    pod: &'a str,
    refreshed: String,
}

impl<'a> Header<'a> {
    pub fn new(pod: &'a str, refreshed: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            pod,
            refreshed: refreshed.format("%H:%M:%S").to_string(),
        }
    }
}

impl<'a> Widget for Header<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let line = Line::from(vec![
            Span::styled(
                self.pod,
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  refreshed {}", self.refreshed),
                Style::default().fg(Color::DarkGray),
            ),
        ]);
        Paragraph::new(line).render(area, buf);
    }
}

pub struct StatusBar<'a> {
    shown: usize,
    total: usize,
    alerts: usize,
    active_filters: &'a [String],
    message: Option<&'a str>,
}

impl<'a> StatusBar<'a> {
    pub fn new(
        shown: usize,
        total: usize,
        alerts: usize,
        active_filters: &'a [String],
        message: Option<&'a str>,
    ) -> Self {
        Self {
            shown,
            total,
            alerts,
            active_filters,
            message,
        }
    }
}

impl<'a> Widget for StatusBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let filters_str = if self.active_filters.is_empty() {
            "none".to_string()
        } else {
            self.active_filters.join(", ")
        };

        let mut status_text = [
            format!("Lines: {}/{}", self.shown, self.total),
            format!("Alerts: {}", self.alerts),
            format!("View: {}", filters_str),
        ]
        .join(" | ");

        if let Some(message) = self.message {
            status_text.push_str(" | ");
            status_text.push_str(message);
        }
        status_text.push_str(" | ? for help");

        let paragraph = Paragraph::new(status_text)
            .style(Style::default().bg(Color::DarkGray).fg(Color::White));

        paragraph.render(area, buf);
    }
}

pub struct HelpOverlay;

impl Widget for HelpOverlay {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let help_lines = vec![
            "Keyboard Shortcuts",
            "",
            "  q/Q/Ctrl-C  - Quit",
            "  a           - Toggle alerts only (warn/error/panic)",
            "  r           - Toggle newest first",
            "  e           - Export raw log to <pod>.logs",
            "  /           - Search (highlights matches)",
            "  ?           - Toggle this help",
            "",
            "Navigation:",
            "  ↑/↓ j/k     - Scroll",
            "  PgUp/PgDn   - Page scroll",
            "  Home/End    - Jump to top/bottom",
            "  g/G         - Jump to top/bottom (vim-style)",
            "",
            "Press any key to close",
        ];

        let lines: Vec<Line> = help_lines.iter().map(|s| Line::from(*s)).collect();

        let help_width = 60;
        let help_height = help_lines.len() as u16 + 2;
        let x = (area.width.saturating_sub(help_width)) / 2;
        let y = (area.height.saturating_sub(help_height)) / 2;

        let help_area = Rect {
            x: area.x + x,
            y: area.y + y,
            width: help_width.min(area.width),
            height: help_height.min(area.height),
        };

        Clear.render(help_area, buf);

        let block = Block::default()
            .title("Help")
            .borders(Borders::ALL)
            .style(Style::default().bg(Color::Black).fg(Color::White));

        let paragraph = Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Left)
            .style(Style::default().bg(Color::Black).fg(Color::White));

        paragraph.render(help_area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{Terminal, backend::TestBackend};

    fn row_text(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol())
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    fn render_log_view(lines: &[LogLine], offset: usize, width: u16, height: u16) -> Buffer {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| {
                let refs: Vec<&LogLine> = lines.iter().collect();
                f.render_widget(LogView::new(refs, offset, None), f.area());
            })
            .unwrap();
        terminal.backend().buffer().clone()
    }

    #[test]
    fn test_error_tier_has_alert_background() {
        assert_eq!(tier_style(Tier::Error).bg, Some(Color::Red));
        assert_eq!(tier_style(Tier::Warning).fg, Some(Color::Yellow));
        assert_eq!(tier_style(Tier::Normal), Style::default());
    }

    #[test]
    fn test_structured_line_spans() {
        let line =
            LogLine::parse(r#"{"level":"INFO","time":"12:00:01.500","message":"started"}"#);
        let view = LogView::new(vec![&line], 0, None);
        let rendered = view.format_log_line(&line);
        let text: String = rendered.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "INFO 12:00:01 started");
        assert_eq!(rendered.spans[0].style.fg, Some(Color::Green));
    }

    #[test]
    fn test_search_highlight_splits_spans() {
        let line = LogLine::parse("plain text here");
        let re = Regex::new("(?i)TEXT").unwrap();
        let view = LogView::new(vec![&line], 0, Some(&re));
        let rendered = view.format_log_line(&line);
        let parts: Vec<&str> = rendered.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(parts, vec!["plain ", "text", " here"]);
    }

    #[test]
    fn test_log_view_scrolls_past_u16_lines() {
        let lines: Vec<LogLine> = (0..70_000)
            .map(|i| LogLine::parse(&format!("line {}", i)))
            .collect();
        let buf = render_log_view(&lines, 69_999, 40, 3);
        assert_eq!(row_text(&buf, 0), "line 69999");
        assert_eq!(row_text(&buf, 1), "");
    }

    #[test]
    fn test_log_view_offset_counts_logical_lines() {
        let long = "x".repeat(100);
        let lines = vec![
            LogLine::parse(&long),
            LogLine::parse(&long),
            LogLine::parse("third"),
            LogLine::parse("fourth"),
        ];
        let buf = render_log_view(&lines, 2, 20, 3);
        assert_eq!(row_text(&buf, 0), "third");
        assert_eq!(row_text(&buf, 1), "fourth");
    }
}
