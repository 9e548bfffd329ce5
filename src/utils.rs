use crate::types::{LogLine, Tier};
use crossterm::style::{StyledContent, Stylize};

/// Text shown for a line: `<level> <time> <message>` for structured lines
/// carrying a message, the raw line otherwise.
pub fn display_text(line: &LogLine) -> String {
    match line.display_fields() {
        Some(fields) => {
            let mut parts = Vec::with_capacity(3);
            if let Some(level) = fields.level {
                parts.push(level);
            }
            if let Some(time) = fields.time {
                parts.push(time);
            }
            parts.push(fields.message);
            parts.join(" ")
        }
        None => line.raw.clone(),
    }
}

/// Colored stdout rendering of a line, by tier.
pub fn styled_line(line: &LogLine) -> StyledContent<String> {
    let text = display_text(line);
    match line.tier() {
        Tier::Error => text.white().on_red(),
        Tier::Warning => text.yellow(),
        Tier::Normal => text.stylize(),
    }
}
