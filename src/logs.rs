//! Log line parsing, severity classification and the display pipeline.
//!
//! Matching is plain case-insensitive substring search on the raw text, so a
//! word like "unwarranted" counts as a warning.

use crate::types::{LogLine, Severity, StructuredLine, Tier};
use regex::Regex;

const ERROR_MARKERS: [&str; 2] = ["error", "panic"];
const WARN_MARKER: &str = "warn";
const INFO_MARKER: &str = "info";

impl LogLine {
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            parsed: parse_structured(raw),
        }
    }

    /// Recomputed on every call.
    pub fn severity(&self) -> Severity {
        classify(&self.raw)
    }

    pub fn tier(&self) -> Tier {
        self.severity().tier()
    }

    pub fn is_alert(&self) -> bool {
        is_alert(&self.raw)
    }

    /// Structured fields for display, if the line carries a message.
    pub fn display_fields(&self) -> Option<DisplayFields<'_>> {
        let parsed = self.parsed.as_ref()?;
        let message = parsed.message.as_deref()?;
        Some(DisplayFields {
            level: parsed.level.as_deref(),
            time: parsed.time.as_deref().map(truncate_time),
            message,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayFields<'a> {
    pub level: Option<&'a str>,
    pub time: Option<&'a str>,
    pub message: &'a str,
}

impl DisplayFields<'_> {
    pub fn is_info(&self) -> bool {
        self.level == Some("INFO")
    }
}

impl Severity {
    pub fn tier(&self) -> Tier {
        match self {
            Severity::Error | Severity::Panic => Tier::Error,
            Severity::Warning => Tier::Warning,
            Severity::Info | Severity::Unclassified => Tier::Normal,
        }
    }
}

/// Structured lines are JSON objects; anything else is opaque text.
pub fn parse_structured(raw: &str) -> Option<StructuredLine> {
    let value: serde_json::Value = serde_json::from_str(raw.trim()).ok()?;
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}

pub fn classify(raw: &str) -> Severity {
    let lower = raw.to_lowercase();
    if lower.contains("error") {
        Severity::Error
    } else if lower.contains("panic") {
        Severity::Panic
    } else if lower.contains(WARN_MARKER) {
        Severity::Warning
    } else if lower.contains(INFO_MARKER) {
        Severity::Info
    } else {
        Severity::Unclassified
    }
}

pub fn is_alert(raw: &str) -> bool {
    let lower = raw.to_lowercase();
    ERROR_MARKERS.iter().any(|m| lower.contains(m)) || lower.contains(WARN_MARKER)
}

/// Drop everything from the first `.` on, e.g. `12:00:01.500` -> `12:00:01`.
pub fn truncate_time(time: &str) -> &str {
    time.split('.').next().unwrap_or(time)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewOptions {
    pub alerts_only: bool,
    pub reversed: bool,
}

/// A fetched pod log. The text never changes after construction; lines are
/// parsed once here and every view is derived from them.
#[derive(Debug, Clone)]
pub struct LogSource {
    pod: String,
    raw: String,
    lines: Vec<LogLine>,
}

impl LogSource {
    pub fn new(pod: impl Into<String>, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let lines = raw.lines().map(LogLine::parse).collect();
        Self {
            pod: pod.into(),
            raw,
            lines,
        }
    }

    pub fn pod(&self) -> &str {
        &self.pod
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    pub fn view(&self, options: ViewOptions) -> Vec<&LogLine> {
        view(&self.lines, options)
    }

    /// Export name for the untransformed log text.
    pub fn export_file_name(&self) -> String {
        format!("{}.logs", self.pod)
    }
}

pub fn filter_alerts<'a>(lines: impl IntoIterator<Item = &'a LogLine>) -> Vec<&'a LogLine> {
    lines.into_iter().filter(|l| l.is_alert()).collect()
}

pub fn view(lines: &[LogLine], options: ViewOptions) -> Vec<&LogLine> {
    let mut shown: Vec<&LogLine> = if options.alerts_only {
        filter_alerts(lines)
    } else {
        lines.iter().collect()
    };
    if options.reversed {
        shown.reverse();
    }
    shown
}

/// Extra case-insensitive regex restriction on top of a view.
pub fn grep<'a>(lines: Vec<&'a LogLine>, pattern: Option<&Regex>) -> Vec<&'a LogLine> {
    match pattern {
        Some(re) => lines.into_iter().filter(|l| re.is_match(&l.raw)).collect(),
        None => lines,
    }
}

pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("(?i){}", pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOB: &str = "INFO line one\nWARN something odd\nERROR boom";

    fn raws(lines: &[&LogLine]) -> Vec<String> {
        lines.iter().map(|l| l.raw.clone()).collect()
    }

    #[test]
    fn test_default_view_keeps_order_and_tiers() {
        let source = LogSource::new("app", BLOB);
        let shown = source.view(ViewOptions::default());
        assert_eq!(shown.len(), 3);
        let tiers: Vec<Tier> = shown.iter().map(|l| l.tier()).collect();
        assert_eq!(tiers, vec![Tier::Normal, Tier::Warning, Tier::Error]);
    }

    #[test]
    fn test_alerts_only_view() {
        let source = LogSource::new("app", BLOB);
        let shown = source.view(ViewOptions {
            alerts_only: true,
            reversed: false,
        });
        assert_eq!(raws(&shown), vec!["WARN something odd", "ERROR boom"]);
    }

    #[test]
    fn test_alerts_only_reversed_view() {
        let source = LogSource::new("app", BLOB);
        let shown = source.view(ViewOptions {
            alerts_only: true,
            reversed: true,
        });
        assert_eq!(raws(&shown), vec!["ERROR boom", "WARN something odd"]);
    }

    #[test]
    fn test_filter_and_reverse_commute_on_content() {
        let source = LogSource::new(
            "app",
            "a warn\nb\nc error\nd panic\ne\nf WARNING again",
        );
        let filter_then_reverse = source.view(ViewOptions {
            alerts_only: true,
            reversed: true,
        });

        let mut reversed: Vec<LogLine> = source.lines().to_vec();
        reversed.reverse();
        let reverse_then_filter = filter_alerts(&reversed);

        assert_eq!(raws(&filter_then_reverse), raws(&reverse_then_filter));
    }

    #[test]
    fn test_toggling_filter_off_restores_source() {
        let source = LogSource::new("app", BLOB);
        let _ = source.view(ViewOptions {
            alerts_only: true,
            reversed: true,
        });
        let shown = source.view(ViewOptions::default());
        assert_eq!(
            raws(&shown),
            vec!["INFO line one", "WARN something odd", "ERROR boom"]
        );
        assert_eq!(source.raw(), BLOB);
    }

    #[test]
    fn test_classification_precedence() {
        assert_eq!(classify("warn: got an ERROR"), Severity::Error);
        assert_eq!(classify("kernel Panic"), Severity::Panic);
        assert_eq!(classify("panic then warn").tier(), Tier::Error);
        assert_eq!(classify("Warning: disk"), Severity::Warning);
        assert_eq!(classify("level=info ok"), Severity::Info);
        assert_eq!(classify("nothing here"), Severity::Unclassified);
    }

    #[test]
    fn test_classification_is_substring_based() {
        assert_eq!(classify("operator was forewarned"), Severity::Warning);
        assert!(is_alert("operator was forewarned"));
        assert_eq!(classify("an unwarranted request"), Severity::Unclassified);
    }

    #[test]
    fn test_classification_is_stable() {
        let line = LogLine::parse("something ERROR happened");
        assert_eq!(line.severity(), line.severity());
    }

    #[test]
    fn test_structured_line_rendering() {
        let line =
            LogLine::parse(r#"{"level":"INFO","time":"12:00:01.500","message":"started"}"#);
        let fields = line.display_fields().unwrap();
        assert_eq!(fields.time, Some("12:00:01"));
        assert_eq!(fields.message, "started");
        assert!(fields.is_info());
    }

    #[test]
    fn test_plain_line_has_no_structured_fields() {
        let line = LogLine::parse("plain text");
        assert!(line.parsed.is_none());
        assert!(line.display_fields().is_none());
        assert_eq!(line.raw, "plain text");
    }

    #[test]
    fn test_structured_without_message_falls_back_to_raw() {
        let line = LogLine::parse(r#"{"level":"WARN"}"#);
        assert!(line.parsed.is_some());
        assert!(line.display_fields().is_none());
        assert_eq!(line.tier(), Tier::Warning);
    }

    #[test]
    fn test_json_scalars_are_not_structured() {
        assert!(parse_structured("42").is_none());
        assert!(parse_structured("\"quoted\"").is_none());
    }

    #[test]
    fn test_truncate_time_without_fraction() {
        assert_eq!(truncate_time("12:00:01"), "12:00:01");
        assert_eq!(truncate_time("2024-01-01T10:00:00.123Z"), "2024-01-01T10:00:00");
    }

    #[test]
    fn test_grep_is_case_insensitive() {
        let source = LogSource::new("app", BLOB);
        let re = compile_pattern("boom").unwrap();
        let shown = grep(source.view(ViewOptions::default()), Some(&re));
        assert_eq!(raws(&shown), vec!["ERROR boom"]);
        let re = compile_pattern("LINE").unwrap();
        assert_eq!(grep(source.view(ViewOptions::default()), Some(&re)).len(), 1);
    }

    #[test]
    fn test_export_file_name() {
        let source = LogSource::new("wandb-app-0", BLOB);
        assert_eq!(source.export_file_name(), "wandb-app-0.logs");
    }
}
