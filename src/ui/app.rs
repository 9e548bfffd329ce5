use crate::archive::FileSink;
use crate::logs::{LogSource, ViewOptions, compile_pattern, grep};
use crate::types::LogLine;
use regex::Regex;

#[derive(Debug, Clone, PartialEq)]
pub enum AppMode {
    Normal,
    Search,
    Help,
}

pub struct App {
    pub source: LogSource,
    pub view: ViewOptions,
    pub grep: Option<Regex>,

    pub scroll_offset: usize,

    // Search state (/ key - highlights matches)
    pub search_pattern: String,

    pub mode: AppMode,
    pub help_visible: bool,
    pub status_message: Option<String>,
    pub last_refresh: chrono::DateTime<chrono::Utc>,
}

impl App {
    pub fn new(source: LogSource, view: ViewOptions, grep: Option<Regex>) -> Self {
        Self {
            source,
            view,
            grep,
            scroll_offset: 0,
            search_pattern: String::new(),
            mode: AppMode::Normal,
            help_visible: false,
            status_message: None,
            last_refresh: chrono::Utc::now(),
        }
    }

    /// Lines as currently displayed. Derived from the source on every call.
    pub fn visible_lines(&self) -> Vec<&LogLine> {
        grep(self.source.view(self.view), self.grep.as_ref())
    }

    pub fn search_regex(&self) -> Option<Regex> {
        if self.search_pattern.is_empty() {
            None
        } else {
            compile_pattern(&self.search_pattern).ok()
        }
    }

    pub fn replace_source(&mut self, raw: String) {
        self.source = LogSource::new(self.source.pod().to_string(), raw);
        self.last_refresh = chrono::Utc::now();
        self.clamp_scroll();
    }

    pub fn toggle_alerts_only(&mut self) {
        self.view.alerts_only = !self.view.alerts_only;
        self.clamp_scroll();
    }

    pub fn toggle_reversed(&mut self) {
        self.view.reversed = !self.view.reversed;
        self.scroll_offset = 0;
    }

    /// Save the raw log text regardless of the active view.
    pub fn export(&mut self, sink: &dyn FileSink) {
        let name = self.source.export_file_name();
        self.status_message = Some(match sink.save(self.source.raw().as_bytes(), &name) {
            Ok(path) => format!("Exported to {}", path.display()),
            Err(e) => format!("Export failed: {}", e),
        });
    }

    fn max_offset(&self) -> usize {
        self.visible_lines().len().saturating_sub(1)
    }

    fn clamp_scroll(&mut self) {
        self.scroll_offset = self.scroll_offset.min(self.max_offset());
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        if self.scroll_offset < self.max_offset() {
            self.scroll_offset += 1;
        }
    }

    pub fn page_up(&mut self, page_size: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(page_size);
    }

    pub fn page_down(&mut self, page_size: usize) {
        self.scroll_offset = (self.scroll_offset + page_size).min(self.max_offset());
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = self.max_offset();
    }

    pub fn active_filters(&self) -> Vec<String> {
        let mut filters = Vec::new();
        if self.view.alerts_only {
            filters.push("alerts".to_string());
        }
        if self.view.reversed {
            filters.push("newest first".to_string());
        }
        if let Some(re) = &self.grep {
            filters.push(format!("grep: {}", re.as_str().trim_start_matches("(?i)")));
        }
        if !self.search_pattern.is_empty() {
            filters.push(format!("search: {}", self.search_pattern));
        }
        filters
    }
}
