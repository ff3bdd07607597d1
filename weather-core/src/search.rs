//! Debounced place search with an autocomplete list.
//!
//! `input` restarts the debounce timer on every keystroke; when the text has
//! been stable for the debounce interval, one forward search runs and its
//! results open the suggestion list. `select` fills the field, closes the
//! list and hands the chosen place back to the caller.

use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tracing::debug;

use crate::{
    config::SearchConfig,
    debounce::DebounceTimer,
    model::{GeoCandidate, SelectedLocation},
    provider::Geocoder,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub debounce: Duration,
    pub blur_grace: Duration,
    pub limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for SearchOptions {
    fn from(cfg: &SearchConfig) -> Self {
        Self { debounce: cfg.debounce(), blur_grace: cfg.blur_grace(), limit: cfg.limit }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchPhase {
    #[default]
    Idle,
    Typing,
    SuggestionsOpen,
    Selected,
}

/// What the search box currently shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchView {
    pub text: String,
    pub phase: SearchPhase,
    pub suggestions: Vec<GeoCandidate>,
    pub is_open: bool,
    pub is_loading: bool,
}

impl SearchView {
    /// Suggestions as rendered: nothing unless the list is open.
    pub fn visible_suggestions(&self) -> &[GeoCandidate] {
        if self.is_open { &self.suggestions } else { &[] }
    }
}

#[derive(Debug, Default)]
struct SearchState {
    view: SearchView,
    /// Set by a selection, cleared by the next keystroke. Late results
    /// cannot reopen the list while it is set.
    selected: bool,
    focused: bool,
}

pub struct SearchInput {
    geocoder: Arc<dyn Geocoder>,
    options: SearchOptions,
    state: Arc<Mutex<SearchState>>,
    debounce: DebounceTimer,
    grace: DebounceTimer,
}

impl std::fmt::Debug for SearchInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchInput")
            .field("options", &self.options)
            .field("view", &self.view())
            .finish_non_exhaustive()
    }
}

impl SearchInput {
    pub fn new(geocoder: Arc<dyn Geocoder>, options: SearchOptions) -> Self {
        Self {
            geocoder,
            options,
            state: Arc::new(Mutex::new(SearchState::default())),
            debounce: DebounceTimer::new(),
            grace: DebounceTimer::new(),
        }
    }

    pub fn view(&self) -> SearchView {
        self.state.lock().view.clone()
    }

    /// A keystroke: the field now holds `text`.
    pub fn input(&self, text: &str) {
        self.grace.cancel();

        let query = {
            let mut state = self.state.lock();
            state.selected = false;
            state.focused = true;
            state.view.text = text.to_string();
            // Any search still in flight is superseded below.
            state.view.is_loading = false;

            if text.trim().is_empty() {
                state.view.suggestions.clear();
                state.view.is_open = false;
                state.view.phase = SearchPhase::Idle;
                None
            } else {
                state.view.phase = SearchPhase::Typing;
                state.view.is_open = !state.view.suggestions.is_empty();
                Some(text.to_string())
            }
        };

        match query {
            Some(query) => {
                let job = run_search(
                    Arc::clone(&self.state),
                    Arc::clone(&self.geocoder),
                    query,
                    self.options.limit,
                );
                self.debounce.schedule(self.options.debounce, job);
            }
            None => {
                self.debounce.cancel();
            }
        }
    }

    /// Pick suggestion `index`. Returns `None` if there is no such suggestion.
    pub fn select(&self, index: usize) -> Option<SelectedLocation> {
        let selected = {
            let mut state = self.state.lock();
            let candidate = state.view.suggestions.get(index)?.clone();

            state.selected = true;
            state.view.text = candidate.display_name();
            state.view.suggestions.clear();
            state.view.is_open = false;
            state.view.is_loading = false;
            state.view.phase = SearchPhase::Selected;
            SelectedLocation::from(&candidate)
        };

        // Selecting blurs the field: no more fetching until the next keystroke.
        self.debounce.cancel();
        self.blur();

        debug!(name = %selected.display_name, "Search selection");
        Some(selected)
    }

    /// The field lost focus. The list closes after the grace delay so a click
    /// on a suggestion still lands.
    pub fn blur(&self) {
        self.state.lock().focused = false;

        let state = Arc::clone(&self.state);
        self.grace.schedule(self.options.blur_grace, async move {
            let mut state = state.lock();
            state.view.suggestions.clear();
            state.view.is_open = false;
            if state.view.phase != SearchPhase::Typing {
                state.view.phase = SearchPhase::Idle;
            }
        });
    }

    pub fn is_search_pending(&self) -> bool {
        self.debounce.is_pending()
    }
}

async fn run_search(
    state: Arc<Mutex<SearchState>>,
    geocoder: Arc<dyn Geocoder>,
    query: String,
    limit: usize,
) {
    {
        let mut state = state.lock();
        if state.selected {
            return;
        }
        state.view.is_loading = true;
    }

    let results = geocoder.forward_search(&query, limit).await;

    let mut state = state.lock();
    state.view.is_loading = false;
    if state.selected {
        return;
    }
    state.view.is_open = state.focused && !results.is_empty();
    state.view.suggestions = results;

    if state.view.phase == SearchPhase::Typing && state.view.is_open {
        state.view.phase = SearchPhase::SuggestionsOpen;
    }
}
