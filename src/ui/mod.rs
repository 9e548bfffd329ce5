pub mod app;
pub mod events;
pub mod layout;
pub mod renderer;
pub mod widgets;

pub use app::App;
pub use events::AppEvent;

use crate::archive::FileSink;
use crate::kubernetes::ResourceSource;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Pod logs are re-fetched on this interval while the viewer is open.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(60);

fn spawn_refresh<S>(source: S, pod: String, namespace: String, tx: mpsc::Sender<AppEvent>)
where
    S: ResourceSource + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(REFRESH_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately and the log was just fetched.
        interval.tick().await;
        loop {
            interval.tick().await;
            let event = match source.fetch_pod_log(&pod, &namespace).await {
                Ok(text) => AppEvent::LogRefreshed(text),
                Err(e) => AppEvent::RefreshFailed(e.to_string()),
            };
            if tx.send(event).await.is_err() {
                break;
            }
        }
    });
}

pub async fn run_viewer<S>(
    mut app: App,
    source: S,
    namespace: String,
    sink: &dyn FileSink,
) -> anyhow::Result<()>
where
    S: ResourceSource + 'static,
{
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(100);

    let key_tx = event_tx.clone();
    tokio::spawn(async move {
        events::event_loop(key_tx).await;
    });
    spawn_refresh(source, app.source.pod().to_string(), namespace, event_tx);

    let result = loop {
        if let Err(e) = renderer::render(&mut terminal, &mut app) {
            break Err(e.into());
        }
        let Some(event) = event_rx.recv().await else {
            break Ok(());
        };
        match event {
            AppEvent::Key(key) => {
                if !events::handle_key_event(&mut app, key, sink) {
                    break Ok(());
                }
            }
            AppEvent::LogRefreshed(text) => {
                debug!(pod = app.source.pod(), bytes = text.len(), "Log refreshed");
                app.replace_source(text);
            }
            AppEvent::RefreshFailed(err) => {
                warn!(pod = app.source.pod(), error = %err, "Log refresh failed");
                app.status_message = Some(format!("Refresh failed: {}", err));
            }
            AppEvent::Tick => {}
        }
    };

    // Cleanup terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
