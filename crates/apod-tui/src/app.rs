// TUI application state and event handling
use apod_core::{ApodEntry, FavoritesStore, FetchSlot, Ticket, ViewState};
use ratatui::widgets::ListState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,  // Browsing the current page
    Editing, // Typing a date
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Today,
    Date,
    Range,
    Gallery,
    Favorites,
}

impl Page {
    pub const ALL: [Page; 5] = [
        Page::Today,
        Page::Date,
        Page::Range,
        Page::Gallery,
        Page::Favorites,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Page::Today => "Today",
            Page::Date => "Date Explorer",
            Page::Range => "Range Explorer",
            Page::Gallery => "Gallery",
            Page::Favorites => "Favorites",
        }
    }

    pub fn index(&self) -> usize {
        Page::ALL.iter().position(|p| p == self).unwrap_or(0)
    }

    /// Pages that show a list of entries rather than a single one
    pub fn is_list(&self) -> bool {
        matches!(self, Page::Range | Page::Gallery | Page::Favorites)
    }

    /// Pages with a date input box
    pub fn takes_input(&self) -> bool {
        matches!(self, Page::Date | Page::Range)
    }
}

/// Which box keystrokes go to while editing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Single,
    RangeStart,
    RangeEnd,
}

/// A fetch the runner should start on a background task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    Today,
    Date(String),
    Range { start: String, end: String },
    Gallery(u32),
}

/// A finished fetch coming back from its task
#[derive(Debug)]
pub enum FetchOutcome {
    Single {
        page: Page,
        ticket: Ticket,
        result: Result<ApodEntry, String>,
    },
    List {
        page: Page,
        ticket: Ticket,
        result: Result<Vec<ApodEntry>, String>,
    },
}

pub struct App {
    pub should_quit: bool,
    pub page: Page,
    pub input_mode: InputMode,
    pub active_field: DateField,

    pub today: FetchSlot<ApodEntry>,
    pub date_view: FetchSlot<ApodEntry>,
    pub range_view: FetchSlot<Vec<ApodEntry>>,
    pub gallery: FetchSlot<Vec<ApodEntry>>,
    pub favorites: FavoritesStore,

    pub date_input: String,
    pub range_start_input: String,
    pub range_end_input: String,

    pub gallery_days: u32,
    pub list_state: ListState,
    pub detail_scroll: u16,
    pub status_message: Option<String>,
}

impl App {
    pub fn new(favorites: FavoritesStore, gallery_days: u32) -> Self {
        // Surface a load problem right away instead of on the first toggle
        let status_message = favorites.persistence_warning().map(str::to_string);

        Self {
            should_quit: false,
            page: Page::Today,
            input_mode: InputMode::Normal,
            active_field: DateField::Single,
            today: FetchSlot::new(),
            date_view: FetchSlot::new(),
            range_view: FetchSlot::new(),
            gallery: FetchSlot::new(),
            favorites,
            date_input: String::new(),
            range_start_input: String::new(),
            range_end_input: String::new(),
            gallery_days,
            list_state: ListState::default(),
            detail_scroll: 0,
            status_message,
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Switch page. Returns a fetch to start if the page has never loaded.
    pub fn select_page(&mut self, page: Page) -> Option<FetchRequest> {
        if self.page != page {
            self.page = page;
            self.input_mode = InputMode::Normal;
            self.active_field = match page {
                Page::Range => DateField::RangeStart,
                _ => DateField::Single,
            };
            self.detail_scroll = 0;
            self.list_state
                .select(if self.list_len() > 0 { Some(0) } else { None });
        }

        match page {
            Page::Today if matches!(self.today.state(), ViewState::Idle) => Some(FetchRequest::Today),
            Page::Gallery if matches!(self.gallery.state(), ViewState::Idle) => {
                Some(FetchRequest::Gallery(self.gallery_days))
            }
            _ => None,
        }
    }

    pub fn next_page(&mut self) -> Option<FetchRequest> {
        let next = Page::ALL[(self.page.index() + 1) % Page::ALL.len()];
        self.select_page(next)
    }

    pub fn previous_page(&mut self) -> Option<FetchRequest> {
        let len = Page::ALL.len();
        let prev = Page::ALL[(self.page.index() + len - 1) % len];
        self.select_page(prev)
    }

    /// Re-run whatever the current page last showed
    pub fn refresh(&mut self) -> Option<FetchRequest> {
        match self.page {
            Page::Today => Some(FetchRequest::Today),
            Page::Gallery => Some(FetchRequest::Gallery(self.gallery_days)),
            Page::Date | Page::Range => self.submit_input(),
            Page::Favorites => None,
        }
    }

    pub fn enter_editing_mode(&mut self) {
        if self.page.takes_input() {
            self.input_mode = InputMode::Editing;
        }
    }

    pub fn enter_normal_mode(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    fn active_input(&mut self) -> &mut String {
        match self.active_field {
            DateField::Single => &mut self.date_input,
            DateField::RangeStart => &mut self.range_start_input,
            DateField::RangeEnd => &mut self.range_end_input,
        }
    }

    pub fn push_char(&mut self, c: char) {
        // YYYY-MM-DD is all we ever need
        if c.is_ascii_digit() || c == '-' {
            let input = self.active_input();
            if input.len() < 10 {
                input.push(c);
            }
        }
    }

    pub fn pop_char(&mut self) {
        self.active_input().pop();
    }

    pub fn switch_field(&mut self) {
        self.active_field = match self.active_field {
            DateField::RangeStart => DateField::RangeEnd,
            DateField::RangeEnd => DateField::RangeStart,
            DateField::Single => DateField::Single,
        };
    }

    /// Turn the typed date(s) into a fetch. Leaves editing mode either way.
    pub fn submit_input(&mut self) -> Option<FetchRequest> {
        self.input_mode = InputMode::Normal;
        match self.page {
            Page::Date if !self.date_input.is_empty() => {
                Some(FetchRequest::Date(self.date_input.clone()))
            }
            Page::Range if !self.range_start_input.is_empty() && !self.range_end_input.is_empty() => {
                Some(FetchRequest::Range {
                    start: self.range_start_input.clone(),
                    end: self.range_end_input.clone(),
                })
            }
            Page::Range => {
                self.status_message = Some("Enter both a start and an end date".to_string());
                None
            }
            _ => None,
        }
    }

    /// Put the page for `request` into its loading state and take a ticket
    pub fn begin_fetch(&mut self, request: &FetchRequest) -> Ticket {
        self.status_message = None;
        self.detail_scroll = 0;
        match request {
            FetchRequest::Today => self.today.begin(),
            FetchRequest::Date(_) => self.date_view.begin(),
            FetchRequest::Range { .. } => {
                self.list_state.select(None);
                self.range_view.begin()
            }
            FetchRequest::Gallery(_) => {
                self.list_state.select(None);
                self.gallery.begin()
            }
        }
    }

    /// Apply a finished fetch. Stale responses are dropped by the page's slot.
    pub fn apply(&mut self, outcome: FetchOutcome) {
        let (accepted, error) = match outcome {
            FetchOutcome::Single { page, ticket, result } => {
                let error = result.as_ref().err().cloned();
                let slot = match page {
                    Page::Date => &mut self.date_view,
                    _ => &mut self.today,
                };
                (slot.complete(ticket, ViewState::from_result(result)), error)
            }
            FetchOutcome::List { page, ticket, result } => {
                let error = result.as_ref().err().cloned();
                let slot = match page {
                    Page::Gallery => &mut self.gallery,
                    _ => &mut self.range_view,
                };
                let accepted = slot.complete(ticket, ViewState::from_list(result));
                if accepted && page == self.page {
                    self.list_state
                        .select(if self.list_len() > 0 { Some(0) } else { None });
                }
                (accepted, error)
            }
        };

        if accepted {
            if let Some(e) = error {
                self.status_message = Some(e);
            }
        }
    }

    /// Entries listed on the current page, if it is a list page
    pub fn current_list(&self) -> &[ApodEntry] {
        match self.page {
            Page::Range => self.range_view.state().loaded().map(Vec::as_slice).unwrap_or(&[]),
            Page::Gallery => self.gallery.state().loaded().map(Vec::as_slice).unwrap_or(&[]),
            Page::Favorites => self.favorites.items(),
            _ => &[],
        }
    }

    fn list_len(&self) -> usize {
        self.current_list().len()
    }

    /// The entry the user is looking at right now
    pub fn selected_entry(&self) -> Option<&ApodEntry> {
        match self.page {
            Page::Today => self.today.state().loaded(),
            Page::Date => self.date_view.state().loaded(),
            _ => self
                .list_state
                .selected()
                .and_then(|i| self.current_list().get(i)),
        }
    }

    pub fn next_item(&mut self) {
        if self.page.is_list() {
            let len = self.list_len();
            if len > 0 {
                let next = self.list_state.selected().map(|i| (i + 1).min(len - 1)).unwrap_or(0);
                self.list_state.select(Some(next));
                self.detail_scroll = 0;
            }
        } else {
            self.scroll_down();
        }
    }

    pub fn previous_item(&mut self) {
        if self.page.is_list() {
            if let Some(i) = self.list_state.selected() {
                self.list_state.select(Some(i.saturating_sub(1)));
                self.detail_scroll = 0;
            }
        } else {
            self.scroll_up();
        }
    }

    pub fn scroll_down(&mut self) {
        self.detail_scroll = self.detail_scroll.saturating_add(1);
    }

    pub fn scroll_up(&mut self) {
        self.detail_scroll = self.detail_scroll.saturating_sub(1);
    }

    /// Favorite or unfavorite whatever is selected
    pub fn toggle_selected_favorite(&mut self) {
        let Some(entry) = self.selected_entry().cloned() else {
            return;
        };

        let date = entry.date.clone();
        self.favorites.toggle(entry);
        let now_favorite = self.favorites.is_favorite(&date);

        self.status_message = Some(match self.favorites.persistence_warning() {
            Some(warning) => warning.to_string(),
            None if now_favorite => format!("Added {} to favorites", date),
            None => format!("Removed {} from favorites", date),
        });

        // Unfavoriting on the favorites page shrinks the list under the cursor
        if self.page == Page::Favorites {
            let len = self.list_len();
            match self.list_state.selected() {
                _ if len == 0 => self.list_state.select(None),
                Some(i) if i >= len => self.list_state.select(Some(len - 1)),
                _ => {}
            }
        }
    }

    pub fn is_favorite(&self, entry: &ApodEntry) -> bool {
        self.favorites.is_favorite(&entry.date)
    }

    /// The URL `o` should open
    pub fn selected_url(&self) -> Option<String> {
        self.selected_entry()
            .map(|e| e.best_url().to_string())
            .filter(|u| !u.is_empty())
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }
}
