// TUI event loop and terminal management
use crate::app::{FetchOutcome, FetchRequest};
use crate::{App, InputMode, Page};
use apod_core::{most_recent_first, ApodService, Ticket};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

const TICK: Duration = Duration::from_millis(100);

pub async fn run_tui(mut app: App, service: Arc<ApodService>) -> anyhow::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let result = event_loop(&mut terminal, &mut app, &service, tx, rx).await;

    // Restore terminal even when the loop bailed out
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    service: &Arc<ApodService>,
    tx: UnboundedSender<FetchOutcome>,
    mut rx: UnboundedReceiver<FetchOutcome>,
) -> anyhow::Result<()> {
    // The landing page loads straight away
    if let Some(request) = app.select_page(Page::Today) {
        start_fetch(app, service, &tx, request);
    }

    loop {
        // Apply whatever finished since the last frame
        while let Ok(outcome) = rx.try_recv() {
            app.apply(outcome);
        }

        terminal.draw(|f| crate::ui::render(f, app))?;

        // Poll instead of blocking so finished fetches show up without a keypress
        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(request) = handle_key(app, key) {
                        start_fetch(app, service, &tx, request);
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }

        // Let spawned fetches make progress on a current-thread runtime
        tokio::task::yield_now().await;
    }

    Ok(())
}

/// Map a key press onto app state. Returns a fetch for the runner to start.
fn handle_key(app: &mut App, key: KeyEvent) -> Option<FetchRequest> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.quit();
        return None;
    }

    match app.input_mode {
        InputMode::Editing => match key.code {
            KeyCode::Enter => app.submit_input(),
            KeyCode::Esc => {
                app.enter_normal_mode();
                None
            }
            KeyCode::Tab | KeyCode::BackTab => {
                app.switch_field();
                None
            }
            KeyCode::Backspace => {
                app.pop_char();
                None
            }
            KeyCode::Char(c) => {
                app.push_char(c);
                None
            }
            _ => None,
        },
        InputMode::Normal => {
            app.clear_status();
            match key.code {
                KeyCode::Char('q') => {
                    app.quit();
                    None
                }
                KeyCode::Tab => app.next_page(),
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char(c @ '1'..='5') => {
                    let index = c as usize - '1' as usize;
                    app.select_page(Page::ALL[index])
                }
                KeyCode::Char('e') | KeyCode::Char('/') => {
                    app.enter_editing_mode();
                    None
                }
                KeyCode::Enter if app.page.takes_input() => app.submit_input(),
                KeyCode::Char('r') => app.refresh(),
                KeyCode::Down | KeyCode::Char('j') => {
                    app.next_item();
                    None
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    app.previous_item();
                    None
                }
                KeyCode::PageDown => {
                    app.scroll_down();
                    None
                }
                KeyCode::PageUp => {
                    app.scroll_up();
                    None
                }
                KeyCode::Char('f') => {
                    app.toggle_selected_favorite();
                    None
                }
                KeyCode::Char('o') => {
                    open_selected(app);
                    None
                }
                _ => None,
            }
        }
    }
}

fn open_selected(app: &mut App) {
    if let Some(url) = app.selected_url() {
        if let Err(e) = open::that(&url) {
            warn!("Failed to open {}: {}", url, e);
            app.status_message = Some(format!("Could not open browser: {}", e));
        }
    }
}

/// Mark the page as loading and run the fetch on its own task.
/// The result comes back through `tx` tagged with the page's ticket.
fn start_fetch(
    app: &mut App,
    service: &Arc<ApodService>,
    tx: &UnboundedSender<FetchOutcome>,
    request: FetchRequest,
) {
    let ticket = app.begin_fetch(&request);
    debug!("Starting fetch #{} for {:?}", ticket.sequence(), request);

    let service = Arc::clone(service);
    let tx = tx.clone();
    tokio::spawn(async move {
        let outcome = run_fetch(&service, ticket, request).await;
        // Receiver is gone only when the UI has exited
        let _ = tx.send(outcome);
    });
}

async fn run_fetch(service: &ApodService, ticket: Ticket, request: FetchRequest) -> FetchOutcome {
    match request {
        FetchRequest::Today => FetchOutcome::Single {
            page: Page::Today,
            ticket,
            result: service.today().await.map_err(|e| e.to_string()),
        },
        FetchRequest::Date(date) => FetchOutcome::Single {
            page: Page::Date,
            ticket,
            result: service.by_date_str(&date).await.map_err(|e| e.to_string()),
        },
        FetchRequest::Range { start, end } => FetchOutcome::List {
            page: Page::Range,
            ticket,
            result: service
                .range_str(&start, &end)
                .await
                .map(most_recent_first)
                .map_err(|e| e.to_string()),
        },
        FetchRequest::Gallery(days) => FetchOutcome::List {
            page: Page::Gallery,
            ticket,
            result: service
                .gallery(days)
                .await
                .map(most_recent_first)
                .map_err(|e| e.to_string()),
        },
    }
}
