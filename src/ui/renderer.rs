use crate::ui::app::{App, AppMode};
use crate::ui::layout::create_layout;
use crate::ui::widgets::{Header, HelpOverlay, LogView, StatusBar};
use ratatui::{Frame, Terminal, backend::Backend};

pub fn render<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> std::io::Result<()> {
    terminal.draw(|f| render_frame(f, app))?;
    Ok(())
}

fn render_frame(f: &mut Frame, app: &mut App) {
    let layout = create_layout(f.area());

    f.render_widget(Header::new(app.source.pod(), app.last_refresh), layout.header);

    // Render log view
    let search = app.search_regex();
    let visible = app.visible_lines();
    let shown = visible.len();
    let log_view = LogView::new(visible, app.scroll_offset, search.as_ref());
    f.render_widget(log_view, layout.main);

    // Render status bar
    let total = app.source.lines().len();
    let alerts = app.source.lines().iter().filter(|l| l.is_alert()).count();
    let filters = app.active_filters();
    let status_bar = StatusBar::new(
        shown,
        total,
        alerts,
        &filters,
        app.status_message.as_deref(),
    );
    f.render_widget(status_bar, layout.status_bar);

    // Render help overlay if visible
    if app.help_visible {
        f.render_widget(HelpOverlay, f.area());
    }

    // Render search bar if in search mode
    if app.mode == AppMode::Search {
        use ratatui::{
            layout::{Alignment, Constraint, Direction, Layout},
            style::{Color, Style},
            text::Span,
            widgets::{Block, Borders, Clear, Paragraph},
        };

        let search_area = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(3)])
            .split(f.area())[1];

        // Clear the area to make it opaque
        f.render_widget(Clear, search_area);

        let search_text = format!("Search: {}_", app.search_pattern);
        let search_widget = Paragraph::new(Span::styled(
            search_text,
            Style::default().fg(Color::Yellow),
        ))
        .block(
            Block::default()
                .title("Search (Enter to apply, Esc to cancel)")
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Yellow)),
        )
        .alignment(Alignment::Left);

        f.render_widget(search_widget, search_area);
    }
}
