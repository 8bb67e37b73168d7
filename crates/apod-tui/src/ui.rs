// UI rendering logic
use crate::{App, DateField, InputMode, Page};
use apod_core::{ApodEntry, ViewState};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Tabs, Wrap},
    Frame,
};

const HEART: &str = "♥";

pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Page tabs
            Constraint::Min(5),    // Page content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_tabs(frame, app, chunks[0]);

    match app.page {
        Page::Today => render_single(frame, app, app.today.state(), " Today ", chunks[1]),
        Page::Date => {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(3), Constraint::Min(3)])
                .split(chunks[1]);
            render_date_input(frame, app, parts[0]);
            render_single(frame, app, app.date_view.state(), " Entry ", parts[1]);
        }
        Page::Range => {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(3), Constraint::Min(3)])
                .split(chunks[1]);
            render_range_inputs(frame, app, parts[0]);
            render_list_page(frame, app, parts[1]);
        }
        Page::Gallery | Page::Favorites => render_list_page(frame, app, chunks[1]),
    }

    render_status_bar(frame, app, chunks[2]);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = Page::ALL
        .iter()
        .enumerate()
        .map(|(i, page)| {
            let label = match page {
                Page::Favorites => format!("{} {} ({})", i + 1, page.title(), app.favorites.len()),
                _ => format!("{} {}", i + 1, page.title()),
            };
            Line::from(label)
        })
        .collect();

    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Astronomy Picture of the Day "),
        )
        .select(app.page.index())
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_widget(tabs, area);
}

fn input_box<'a>(label: &'a str, value: &'a str, active: bool) -> Paragraph<'a> {
    let style = if active {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let text = if value.is_empty() && !active {
        Span::styled("YYYY-MM-DD", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(value)
    };

    Paragraph::new(Line::from(text))
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(label))
}

fn render_date_input(frame: &mut Frame, app: &App, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    frame.render_widget(input_box(" Date ", &app.date_input, editing), area);
}

fn render_range_inputs(frame: &mut Frame, app: &App, area: Rect) {
    let parts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let editing = app.input_mode == InputMode::Editing;

    frame.render_widget(
        input_box(
            " Start ",
            &app.range_start_input,
            editing && app.active_field == DateField::RangeStart,
        ),
        parts[0],
    );
    frame.render_widget(
        input_box(
            " End ",
            &app.range_end_input,
            editing && app.active_field == DateField::RangeEnd,
        ),
        parts[1],
    );
}

fn placeholder<'a>(message: &'a str, hint: &'a str, title: &'a str) -> Paragraph<'a> {
    let text = vec![
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled(
            message,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))),
    ];

    Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title(title))
        .alignment(Alignment::Center)
}

fn render_single(frame: &mut Frame, app: &App, state: &ViewState<ApodEntry>, title: &str, area: Rect) {
    match state {
        ViewState::Idle => frame.render_widget(
            placeholder("Nothing loaded yet", idle_hint(app.page), title),
            area,
        ),
        ViewState::Loading => frame.render_widget(
            placeholder("Loading...", "Asking the archive", title),
            area,
        ),
        ViewState::Empty => frame.render_widget(
            placeholder("No picture available", "Press r to try again", title),
            area,
        ),
        ViewState::Loaded(entry) => render_entry_detail(frame, app, entry, area),
    }
}

fn render_entry_detail(frame: &mut Frame, app: &App, entry: &ApodEntry, area: Rect) {
    let label = Style::default().fg(Color::DarkGray);
    let mut title_spans = vec![Span::styled(
        entry.title.clone(),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    if app.is_favorite(entry) {
        title_spans.push(Span::styled(
            format!("  {}", HEART),
            Style::default().fg(Color::Red),
        ));
    }

    let mut lines = vec![
        Line::from(title_spans),
        Line::from(""),
        Line::from(vec![Span::styled("Date:      ", label), Span::raw(entry.date.clone())]),
        Line::from(vec![
            Span::styled("Media:     ", label),
            Span::raw(entry.media_type.to_string()),
        ]),
    ];
    if let Some(copyright) = &entry.copyright {
        lines.push(Line::from(vec![
            Span::styled("Credit:    ", label),
            Span::raw(copyright.clone()),
        ]));
    }
    lines.push(Line::from(vec![
        Span::styled("URL:       ", label),
        Span::styled(entry.url.clone(), Style::default().fg(Color::Blue)),
    ]));
    if let Some(hd) = &entry.hd_url {
        lines.push(Line::from(vec![
            Span::styled("HD:        ", label),
            Span::styled(hd.clone(), Style::default().fg(Color::Blue)),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(entry.explanation.clone()));

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(format!(" {} ", entry.date)))
        .wrap(Wrap { trim: true })
        .scroll((app.detail_scroll, 0));

    frame.render_widget(paragraph, area);
}

/// What to do on a page that hasn't fetched anything yet
pub(crate) fn idle_hint(page: Page) -> &'static str {
    match page {
        Page::Date => "Press e to type a date",
        Page::Range => "Press e to enter a range",
        Page::Favorites => "Press f on any picture to keep it here",
        Page::Today | Page::Gallery => "Press r to load",
    }
}

fn list_state_of(app: &App) -> Option<&ViewState<Vec<ApodEntry>>> {
    match app.page {
        Page::Range => Some(app.range_view.state()),
        Page::Gallery => Some(app.gallery.state()),
        _ => None,
    }
}

fn render_list_page(frame: &mut Frame, app: &mut App, area: Rect) {
    let title = format!(" {} ", app.page.title());

    // Favorites never load; every other list page goes through a fetch
    match list_state_of(app) {
        Some(ViewState::Idle) => {
            frame.render_widget(placeholder("Nothing loaded yet", idle_hint(app.page), &title), area);
            return;
        }
        Some(ViewState::Loading) => {
            frame.render_widget(placeholder("Loading...", "Asking the archive", &title), area);
            return;
        }
        Some(ViewState::Empty) => {
            frame.render_widget(
                placeholder("No pictures found", "Press r to try again", &title),
                area,
            );
            return;
        }
        _ => {}
    }

    if app.page == Page::Favorites && app.favorites.is_empty() {
        frame.render_widget(
            placeholder("No favorites yet", "Press f on any picture to keep it here", &title),
            area,
        );
        return;
    }

    let parts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let items: Vec<ListItem> = app
        .current_list()
        .iter()
        .map(|entry| {
            let marker = if app.is_favorite(entry) {
                Span::styled(format!("{} ", HEART), Style::default().fg(Color::Red))
            } else {
                Span::raw("  ")
            };
            let media = if entry.is_image() { "" } else { " [video]" };
            ListItem::new(Line::from(vec![
                marker,
                Span::styled(entry.date.clone(), Style::default().fg(Color::DarkGray)),
                Span::raw("  "),
                Span::styled(entry.title.clone(), Style::default().fg(Color::Cyan)),
                Span::styled(media, Style::default().fg(Color::Magenta)),
            ]))
        })
        .collect();

    let count = items.len();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{}({}) ", title, count)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, parts[0], &mut app.list_state);

    match app.selected_entry() {
        Some(entry) => render_entry_detail(frame, app, entry, parts[1]),
        None => frame.render_widget(placeholder("", "Select a picture", " Details "), parts[1]),
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status = if let Some(message) = &app.status_message {
        Span::styled(message.as_str(), Style::default().fg(Color::Yellow))
    } else {
        match app.input_mode {
            InputMode::Editing => Span::styled(
                "EDITING | Type YYYY-MM-DD | TAB: other field | ENTER: fetch | ESC: cancel",
                Style::default().fg(Color::Green),
            ),
            InputMode::Normal if app.page.takes_input() => Span::raw(
                "e: enter dates | j/k: move | f: favorite | o: open | r: reload | TAB/1-5: pages | q: quit",
            ),
            InputMode::Normal => Span::raw(
                "j/k: move | f: favorite | o: open | r: reload | TAB/1-5: pages | q: quit",
            ),
        }
    };

    frame.render_widget(Paragraph::new(Line::from(status)), area);
}
