use crate::archive::FileSink;
use crate::ui::app::{App, AppMode};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use futures::StreamExt;
use tokio::sync::mpsc;

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    LogRefreshed(String),
    RefreshFailed(String),
    Tick,
}

pub async fn event_loop(tx: mpsc::Sender<AppEvent>) {
    use crossterm::event::EventStream;

    let mut event_stream = EventStream::new();
    let mut tick_interval = tokio::time::interval(std::time::Duration::from_millis(250));

    loop {
        tokio::select! {
            maybe_event = event_stream.next() => {
                if let Some(Ok(Event::Key(key))) = maybe_event
                    && tx.send(AppEvent::Key(key)).await.is_err() {
                        break;
                    }
            }
            _ = tick_interval.tick() => {
                if tx.send(AppEvent::Tick).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Returns false when the viewer should quit.
pub fn handle_key_event(app: &mut App, key: KeyEvent, sink: &dyn FileSink) -> bool {
    match app.mode {
        AppMode::Normal => handle_normal_mode(app, key, sink),
        AppMode::Search => handle_search_mode(app, key),
        AppMode::Help => handle_help_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent, sink: &dyn FileSink) -> bool {
    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _)
        | (KeyCode::Char('Q'), _)
        | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
            return false;
        }
        (KeyCode::Char('a'), _) => {
            app.toggle_alerts_only();
        }
        (KeyCode::Char('r'), _) => {
            app.toggle_reversed();
        }
        (KeyCode::Char('e'), _) => {
            app.export(sink);
        }
        (KeyCode::Char('/'), _) => {
            app.mode = AppMode::Search;
            app.search_pattern.clear();
        }
        (KeyCode::Char('?'), _) => {
            app.help_visible = !app.help_visible;
            if app.help_visible {
                app.mode = AppMode::Help;
            }
        }
        (KeyCode::Up, _) | (KeyCode::Char('k'), _) => {
            app.scroll_up();
        }
        (KeyCode::Down, _) | (KeyCode::Char('j'), _) => {
            app.scroll_down();
        }
        (KeyCode::PageUp, _) => {
            app.page_up(20);
        }
        (KeyCode::PageDown, _) => {
            app.page_down(20);
        }
        (KeyCode::Home, _) | (KeyCode::Char('g'), _) => {
            app.scroll_to_top();
        }
        (KeyCode::End, _) | (KeyCode::Char('G'), _) => {
            app.scroll_to_bottom();
        }
        _ => {}
    }
    true
}

fn handle_search_mode(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => {
            app.mode = AppMode::Normal;
            app.search_pattern.clear();
        }
        KeyCode::Enter => {
            app.mode = AppMode::Normal;
        }
        KeyCode::Char(c) => {
            app.search_pattern.push(c);
        }
        KeyCode::Backspace => {
            app.search_pattern.pop();
        }
        _ => {}
    }
    true
}

fn handle_help_mode(app: &mut App, _key: KeyEvent) -> bool {
    app.help_visible = false;
    app.mode = AppMode::Normal;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::testing::RecordingSink;
    use crate::logs::{LogSource, ViewOptions};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_view_toggle_keys() {
        let mut app = App::new(LogSource::new("p", "a\nwarn b"), ViewOptions::default(), None);
        let sink = RecordingSink::default();
        assert!(handle_key_event(&mut app, key(KeyCode::Char('a')), &sink));
        assert!(handle_key_event(&mut app, key(KeyCode::Char('r')), &sink));
        assert!(app.view.alerts_only && app.view.reversed);
    }

    #[test]
    fn test_search_mode_collects_pattern() {
        let mut app = App::new(LogSource::new("p", "a"), ViewOptions::default(), None);
        let sink = RecordingSink::default();
        handle_key_event(&mut app, key(KeyCode::Char('/')), &sink);
        handle_key_event(&mut app, key(KeyCode::Char('x')), &sink);
        handle_key_event(&mut app, key(KeyCode::Enter), &sink);
        assert_eq!(app.mode, AppMode::Normal);
        assert_eq!(app.search_pattern, "x");
    }

    #[test]
    fn test_quit_keys() {
        let mut app = App::new(LogSource::new("p", "a"), ViewOptions::default(), None);
        let sink = RecordingSink::default();
        assert!(!handle_key_event(&mut app, key(KeyCode::Char('q')), &sink));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(!handle_key_event(&mut app, ctrl_c, &sink));
    }
}
