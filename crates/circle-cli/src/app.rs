//! Application state machine and key dispatcher.

use chrono::NaiveDate;
use circle_client::{Dataset, LoadError, LoadState};
use circle_core::{contact::Contact, view::ContactDetail};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};

// ─── Screen ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
  /// Upcoming-this-week and happening-later tables.
  Timeline,
  /// Focus on the contact list; right pane previews the cursor contact.
  Contacts,
  /// Focus on the contact detail pane.
  ContactDetail,
}

/// What the event loop should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  Continue,
  Quit,
  Reload,
  SignOut,
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App {
  /// Current screen / keyboard focus.
  pub screen: Screen,

  /// Contacts and events, once loaded.
  pub state: LoadState,

  /// The reference day for every date window on screen.
  pub today: NaiveDate,

  /// Shown in the header.
  pub account: String,

  /// Current fuzzy-filter string (only active when `filter_active`).
  pub filter: String,

  /// Whether the user is typing a filter query.
  pub filter_active: bool,

  /// Cursor position within the *filtered* contact list.
  pub list_cursor: usize,

  /// Scroll offset of the timeline tables.
  pub timeline_scroll: usize,

  /// Scroll offset within the detail pane.
  pub detail_scroll: usize,

  /// Index into the loaded contacts of the contact shown in detail.
  pub selected: Option<usize>,

  /// One-line status message shown in the status bar.
  pub status_msg: String,
}

impl App {
  pub fn new(today: NaiveDate, account: String) -> Self {
    Self {
      screen: Screen::Timeline,
      state: LoadState::Idle,
      today,
      account,
      filter: String::new(),
      filter_active: false,
      list_cursor: 0,
      timeline_scroll: 0,
      detail_scroll: 0,
      selected: None,
      status_msg: String::new(),
    }
  }

  // ── Data loading ──────────────────────────────────────────────────────────

  pub fn start_loading(&mut self) {
    self.state = LoadState::Loading;
    self.status_msg = "Loading contacts…".into();
  }

  /// Apply the result of a load. A cancelled load never replaces loaded
  /// data; if nothing was loaded yet the app goes back to idle so `r` can
  /// start over.
  pub fn finish_loading(&mut self, outcome: Result<Dataset, LoadError>) {
    match outcome {
      Ok(data) => {
        self.status_msg = format!(
          "{} contacts, {} events",
          data.contacts.len(),
          data.events.len()
        );
        self.state = LoadState::Loaded(data);
        self.list_cursor = 0;
        self.timeline_scroll = 0;
        self.detail_scroll = 0;
        self.selected = None;
        if self.screen == Screen::ContactDetail {
          self.screen = Screen::Contacts;
        }
      }
      Err(LoadError::Cancelled) => {
        if self.state.is_loading() {
          self.state = LoadState::Idle;
          self.status_msg = "Load cancelled".into();
        }
      }
      Err(e) => {
        self.status_msg = format!("Error: {e}");
        self.state = LoadState::Failed(e.to_string());
      }
    }
  }

  pub fn contacts(&self) -> &[Contact] {
    self
      .state
      .dataset()
      .map(|d| d.contacts.as_slice())
      .unwrap_or_default()
  }

  // ── Filtered list ─────────────────────────────────────────────────────────

  /// `(index, contact)` pairs matching the current filter query.
  pub fn filtered_contacts(&self) -> Vec<(usize, &Contact)> {
    let all = self.contacts().iter().enumerate();
    if self.filter.is_empty() {
      return all.collect();
    }
    let matcher = SkimMatcherV2::default();
    all
      .filter(|(_, c)| {
        matcher.fuzzy_match(c.display_name(), &self.filter).is_some()
          || matcher.fuzzy_match(&c.email, &self.filter).is_some()
      })
      .collect()
  }

  /// Index of the contact under the list cursor in the filtered view.
  pub fn cursor_index(&self) -> Option<usize> {
    self
      .filtered_contacts()
      .get(self.list_cursor)
      .map(|(i, _)| *i)
  }

  /// The detail read model for the selected contact.
  pub fn selected_detail(&self) -> Option<ContactDetail<'_>> {
    self.detail_at(self.selected?)
  }

  /// What the right pane shows: the selected contact, else the one under
  /// the list cursor.
  pub fn shown_detail(&self) -> Option<ContactDetail<'_>> {
    self.detail_at(self.selected.or_else(|| self.cursor_index())?)
  }

  fn detail_at(&self, index: usize) -> Option<ContactDetail<'_>> {
    let data = self.state.dataset()?;
    let correlated = data.correlated();
    correlated
      .get(index)
      .map(|c| ContactDetail::build(c, self.today))
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event.
  pub fn handle_key(&mut self, key: KeyEvent) -> Action {
    // Global: Ctrl-C quits from anywhere.
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return Action::Quit;
    }

    // Filter input mode: all printable keys go into the filter string.
    if self.filter_active {
      self.handle_filter_key(key);
      return Action::Continue;
    }

    match key.code {
      KeyCode::Char('q') => return Action::Quit,
      KeyCode::Char('r') if !self.state.is_loading() => return Action::Reload,
      KeyCode::Char('L') => return Action::SignOut,
      _ => {}
    }

    match self.screen {
      Screen::Timeline => self.handle_timeline_key(key),
      Screen::Contacts => self.handle_list_key(key),
      Screen::ContactDetail => self.handle_detail_key(key),
    }
    Action::Continue
  }

  fn handle_filter_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.filter_active = false;
        self.filter.clear();
        self.list_cursor = 0;
      }
      KeyCode::Enter => {
        self.filter_active = false;
        self.list_cursor = 0;
        // Immediately open detail if there's exactly one match.
        let single = match self.filtered_contacts().as_slice() {
          [(index, _)] => Some(*index),
          _ => None,
        };
        if let Some(index) = single {
          self.open_detail(index);
        }
      }
      KeyCode::Backspace => {
        self.filter.pop();
        self.list_cursor = 0;
      }
      KeyCode::Char(c) => {
        self.filter.push(c);
        self.list_cursor = 0;
      }
      _ => {}
    }
  }

  fn handle_timeline_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Tab => self.screen = Screen::Contacts,
      KeyCode::Down | KeyCode::Char('j') => {
        let rows = self
          .state
          .dataset()
          .map(|d| {
            let t = d.timeline(self.today);
            t.upcoming.len() + t.later.len()
          })
          .unwrap_or_default();
        if self.timeline_scroll + 1 < rows {
          self.timeline_scroll += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.timeline_scroll = self.timeline_scroll.saturating_sub(1);
      }
      _ => {}
    }
  }

  fn handle_list_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Tab => self.screen = Screen::Timeline,

      // Navigation
      KeyCode::Down | KeyCode::Char('j') => {
        let len = self.filtered_contacts().len();
        if len > 0 && self.list_cursor + 1 < len {
          self.list_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.list_cursor = self.list_cursor.saturating_sub(1);
      }

      // Open detail
      KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
        if let Some(index) = self.cursor_index() {
          self.open_detail(index);
        }
      }

      // Filter
      KeyCode::Char('/') => {
        self.filter_active = true;
        self.filter.clear();
        self.list_cursor = 0;
      }

      _ => {}
    }
  }

  fn handle_detail_key(&mut self, key: KeyEvent) {
    match key.code {
      // Back to list
      KeyCode::Esc | KeyCode::Left | KeyCode::Char('h') => {
        self.screen = Screen::Contacts;
        self.selected = None;
      }
      KeyCode::Tab => {
        self.screen = Screen::Timeline;
        self.selected = None;
      }

      // Scroll detail
      KeyCode::Down | KeyCode::Char('j') => self.detail_scroll += 1,
      KeyCode::Up | KeyCode::Char('k') => {
        self.detail_scroll = self.detail_scroll.saturating_sub(1);
      }

      // Navigate list from detail (for quick switching)
      KeyCode::Char(']') | KeyCode::PageDown => {
        let len = self.filtered_contacts().len();
        if len > 0 && self.list_cursor + 1 < len {
          self.list_cursor += 1;
          if let Some(index) = self.cursor_index() {
            self.open_detail(index);
          }
        }
      }
      KeyCode::Char('[') | KeyCode::PageUp => {
        if self.list_cursor > 0 {
          self.list_cursor -= 1;
          if let Some(index) = self.cursor_index() {
            self.open_detail(index);
          }
        }
      }

      _ => {}
    }
  }

  /// Transition to `ContactDetail` for the contact at `index`.
  fn open_detail(&mut self, index: usize) {
    self.selected = Some(index);
    self.detail_scroll = 0;
    self.screen = Screen::ContactDetail;
  }
}
