//! Widget state and the controller that drives it.
//!
//! All state changes go through [`AppState::apply`]. The reducer is pure: it
//! updates the state and returns at most one [`Effect`] describing the async
//! work to do next. [`AppController`] runs effects on Tokio tasks and feeds
//! their results back in as actions.
//!
//! Every location change takes a fresh [`RequestToken`]. A fetch result
//! carrying an older token is dropped on arrival, so the most recent trigger
//! wins no matter which request finishes last.

use std::{collections::VecDeque, sync::Arc};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    error::AppError,
    location::LocationResolver,
    model::{
        Coordinates, LocationSource, ResolvedLocation, SelectedLocation, WeatherSnapshot,
    },
    provider::{Geocoder, WeatherProvider},
};

const TRANSITION_LOG_CAPACITY: usize = 64;

/// Identifies one location change and the fetch it started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RequestToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppPhase {
    #[default]
    Initializing,
    Locating,
    LocationFailed,
    FetchingWeather,
    Ready,
    FetchError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The widget appeared; find out where the user is.
    Mounted,
    LocationResolved(ResolvedLocation),
    LocationFailed,
    SearchSelected(SelectedLocation),
    WeatherLoaded {
        token: RequestToken,
        snapshot: WeatherSnapshot,
        place_name: String,
    },
    WeatherFailed {
        token: RequestToken,
        error: AppError,
    },
    /// The widget went away. Every later action is ignored.
    Unmounted,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Mounted => "mounted",
            Action::LocationResolved(_) => "location_resolved",
            Action::LocationFailed => "location_failed",
            Action::SearchSelected(_) => "search_selected",
            Action::WeatherLoaded { .. } => "weather_loaded",
            Action::WeatherFailed { .. } => "weather_failed",
            Action::Unmounted => "unmounted",
        }
    }
}

/// How the place name for a fetch is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceQuery {
    /// Reverse-geocode the coordinates.
    Lookup,
    /// The location change already named the place.
    Known(String),
}

/// Async work requested by the reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ResolveLocation,
    FetchWeather {
        token: RequestToken,
        coordinates: Coordinates,
        place: PlaceQuery,
    },
}

/// One entry of the applied-transitions log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub action: &'static str,
    pub from: AppPhase,
    pub to: AppPhase,
    /// False when the action was discarded (stale token, unmounted, wrong phase).
    pub applied: bool,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub location: Option<Coordinates>,
    pub source: Option<LocationSource>,
    pub place_name: Option<String>,
    pub weather: Option<WeatherSnapshot>,
    pub is_loading: bool,
    pub error: Option<AppError>,
    pub phase: AppPhase,
    alive: bool,
    token: RequestToken,
    transitions: VecDeque<Transition>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            location: None,
            source: None,
            place_name: None,
            weather: None,
            is_loading: false,
            error: None,
            phase: AppPhase::Initializing,
            alive: true,
            token: RequestToken::default(),
            transitions: VecDeque::with_capacity(TRANSITION_LOG_CAPACITY),
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Token of the most recent location change.
    pub fn current_token(&self) -> RequestToken {
        self.token
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }

    /// Apply one action and return the effect it asks for, if any.
    pub fn apply(&mut self, action: Action) -> Option<Effect> {
        let name = action.name();
        let from = self.phase;
        let (applied, effect) = self.reduce(action);

        if self.transitions.len() == TRANSITION_LOG_CAPACITY {
            self.transitions.pop_front();
        }
        self.transitions.push_back(Transition { action: name, from, to: self.phase, applied });

        if !applied {
            debug!(action = name, phase = ?from, "Discarded action");
        }
        effect
    }

    fn reduce(&mut self, action: Action) -> (bool, Option<Effect>) {
        if !self.alive {
            return (false, None);
        }

        match action {
            Action::Mounted => {
                if self.phase != AppPhase::Initializing {
                    return (false, None);
                }
                self.phase = AppPhase::Locating;
                (true, Some(Effect::ResolveLocation))
            }

            // A search made while locating has already replaced the location.
            Action::LocationResolved(resolved) => {
                if self.phase != AppPhase::Locating {
                    return (false, None);
                }
                self.source = Some(resolved.source);
                let effect = self.change_location(resolved.coordinates, PlaceQuery::Lookup);
                (true, Some(effect))
            }

            Action::LocationFailed => {
                if self.phase != AppPhase::Locating {
                    return (false, None);
                }
                self.error = Some(AppError::LocationUnavailable);
                self.phase = AppPhase::LocationFailed;
                (true, None)
            }

            Action::SearchSelected(selected) => {
                self.source = Some(LocationSource::Search);
                let place = PlaceQuery::Known(selected.display_name);
                let effect = self.change_location(selected.coordinates, place);
                (true, Some(effect))
            }

            Action::WeatherLoaded { token, snapshot, place_name } => {
                if token != self.token {
                    return (false, None);
                }
                self.weather = Some(snapshot);
                self.place_name = Some(place_name);
                self.error = None;
                self.is_loading = false;
                self.phase = AppPhase::Ready;
                (true, None)
            }

            Action::WeatherFailed { token, error } => {
                if token != self.token {
                    return (false, None);
                }
                self.error = Some(error);
                self.is_loading = false;
                self.phase = AppPhase::FetchError;
                (true, None)
            }

            Action::Unmounted => {
                self.alive = false;
                (true, None)
            }
        }
    }

    fn change_location(&mut self, coordinates: Coordinates, place: PlaceQuery) -> Effect {
        self.token = RequestToken(self.token.0 + 1);
        self.location = Some(coordinates);
        self.is_loading = true;
        self.error = None;
        self.phase = AppPhase::FetchingWeather;

        Effect::FetchWeather { token: self.token, coordinates, place }
    }
}

/// Owns the widget state and runs the effects the reducer asks for.
#[derive(Debug, Clone)]
pub struct AppController {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    state: watch::Sender<AppState>,
    resolver: LocationResolver,
    weather: Arc<dyn WeatherProvider>,
    geocoder: Arc<dyn Geocoder>,
}

impl AppController {
    pub fn new(
        resolver: LocationResolver,
        weather: Arc<dyn WeatherProvider>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        let (state, _) = watch::channel(AppState::new());
        Self { inner: Arc::new(Inner { state, resolver, weather, geocoder }) }
    }

    /// Resolve the user's location once and fetch weather for it.
    /// The returned task finishes when that flow settles.
    pub fn mount(&self) -> JoinHandle<()> {
        self.dispatch(Action::Mounted)
    }

    /// Switch to a place picked in the search box.
    pub fn select_location(&self, selected: SelectedLocation) -> JoinHandle<()> {
        self.dispatch(Action::SearchSelected(selected))
    }

    /// Stop accepting results. Requests already in flight are left to finish
    /// and their results are discarded.
    pub fn unmount(&self) {
        self.inner.apply(Action::Unmounted);
    }

    pub fn state(&self) -> AppState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.inner.state.subscribe()
    }

    fn dispatch(&self, action: Action) -> JoinHandle<()> {
        let effect = self.inner.apply(action);
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            let mut next = effect;
            while let Some(effect) = next.take() {
                let action = inner.perform(effect).await;
                next = inner.apply(action);
            }
        })
    }
}

impl Inner {
    fn apply(&self, action: Action) -> Option<Effect> {
        let mut effect = None;
        self.state.send_modify(|state| effect = state.apply(action));
        effect
    }

    async fn perform(&self, effect: Effect) -> Action {
        match effect {
            Effect::ResolveLocation => match self.resolver.resolve().await {
                Ok(resolved) => {
                    debug!(source = %resolved.source, "Location resolved");
                    Action::LocationResolved(resolved)
                }
                Err(e) => {
                    warn!("{e}");
                    Action::LocationFailed
                }
            },

            Effect::FetchWeather { token, coordinates, place } => {
                let weather = async {
                    self.weather.fetch(coordinates).await.map_err(|e| {
                        warn!("Forecast fetch for {coordinates} failed: {e}");
                        AppError::from(&e)
                    })
                };
                let place_name = async {
                    match place {
                        PlaceQuery::Known(name) => Ok(name),
                        PlaceQuery::Lookup => self
                            .geocoder
                            .reverse_lookup(coordinates)
                            .await
                            .map(|place| place.to_string())
                            .map_err(|e| {
                                warn!("Reverse lookup for {coordinates} failed: {e}");
                                AppError::from(&e)
                            }),
                    }
                };

                match tokio::try_join!(weather, place_name) {
                    Ok((snapshot, place_name)) => {
                        info!(?token, %coordinates, %place_name, "Weather fetched");
                        Action::WeatherLoaded { token, snapshot, place_name }
                    }
                    Err(error) => Action::WeatherFailed { token, error },
                }
            }
        }
    }
}
