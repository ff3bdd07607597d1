//! Presentation of weather data and widget state.
//!
//! Everything here is a pure function of its inputs. [`render_card`] builds a
//! view model that front ends can draw however they like; the `Display`
//! impls produce the plain-text form the CLI prints.

use std::fmt;

use crate::{
    app::AppState,
    format::{format_full_date, format_time},
    model::{HourlyForecastPoint, LocationSource, WeatherSnapshot},
};

pub const HOURLY_SLOTS: usize = 6;
pub const LOADING_MESSAGE: &str = "Loading weather data...";
const UNKNOWN_LOCATION: &str = "Unknown Location";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Day,
    Night,
}

impl Theme {
    pub fn icon(&self) -> &'static str {
        match self {
            Theme::Day => "☀️",
            Theme::Night => "🌙",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detail {
    pub icon: &'static str,
    pub label: &'static str,
    pub value: i64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourlyCell {
    pub time: String,
    pub temperature: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub title: String,
    pub theme: Theme,
    pub date: String,
    pub time: String,
    pub temperature: i64,
    pub details: Vec<Detail>,
    /// `None` when no forecast hour lies after the current observation.
    pub hourly: Option<Vec<HourlyCell>>,
}

impl CardView {
    pub fn temperature_label(&self) -> String {
        format!("{}°C", self.temperature)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeatherCard {
    Loading,
    Ready(CardView),
}

/// Halves round up, so -2.5 shows as -2.
fn round(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Up to [`HOURLY_SLOTS`] points strictly after the current observation.
pub fn upcoming_hours(snapshot: &WeatherSnapshot) -> Vec<&HourlyForecastPoint> {
    let now = snapshot.current.timestamp;
    snapshot.hourly.iter().filter(|p| p.timestamp > now).take(HOURLY_SLOTS).collect()
}

pub fn render_card(snapshot: Option<&WeatherSnapshot>, location_name: Option<&str>) -> WeatherCard {
    let Some(snapshot) = snapshot else {
        return WeatherCard::Loading;
    };
    let current = &snapshot.current;

    let title = location_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(UNKNOWN_LOCATION)
        .to_string();

    let details = vec![
        Detail { icon: "🌧️", label: "Rain", value: round(current.rain_mm), unit: "mm".into() },
        Detail {
            icon: "💧",
            label: "Humidity",
            value: round(current.humidity_pct),
            unit: "%".into(),
        },
        Detail {
            icon: "💨",
            label: "Wind",
            value: round(current.wind_speed_kph),
            unit: "km/h".into(),
        },
        Detail {
            icon: "❄️",
            label: "Snowfall",
            value: round(current.snowfall),
            unit: current.snowfall_unit.clone(),
        },
    ];

    let hourly: Vec<HourlyCell> = upcoming_hours(snapshot)
        .into_iter()
        .map(|p| HourlyCell {
            time: format_time(&p.timestamp),
            temperature: round(p.temperature_c),
        })
        .collect();

    WeatherCard::Ready(CardView {
        title,
        theme: if current.is_day { Theme::Day } else { Theme::Night },
        date: format_full_date(&current.timestamp),
        time: format_time(&current.timestamp),
        temperature: round(current.temperature_c),
        details,
        hourly: (!hourly.is_empty()).then_some(hourly),
    })
}

pub fn source_label(source: LocationSource) -> &'static str {
    match source {
        LocationSource::Gps => "device location",
        LocationSource::Ip => "IP address",
        LocationSource::Search => "search",
    }
}

/// Footer line naming where the location came from. Hidden while loading.
pub fn source_line(source: Option<LocationSource>, is_loading: bool) -> Option<String> {
    match source {
        Some(source) if !is_loading => {
            Some(format!("Weather forecast based on your {}", source_label(source)))
        }
        _ => None,
    }
}

/// The whole widget as text: loading banner, error, card, source footer.
pub fn render_app(state: &AppState) -> String {
    let mut out = Vec::new();

    if state.is_loading {
        out.push(format!("⏳ {LOADING_MESSAGE}"));
    }
    if let Some(error) = state.error.filter(|_| !state.is_loading) {
        out.push(format!("⚠️  {error}"));
    }
    out.push(render_card(state.weather.as_ref(), state.place_name.as_deref()).to_string());
    if let Some(line) = source_line(state.source, state.is_loading) {
        out.push(line);
    }

    out.join("\n\n")
}

impl fmt::Display for WeatherCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeatherCard::Loading => f.write_str(LOADING_MESSAGE),
            WeatherCard::Ready(card) => card.fmt(f),
        }
    }
}

impl fmt::Display for CardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.theme.icon(), self.title)?;
        writeln!(f, "🗓️ {}  🕒 {}", self.date, self.time)?;
        writeln!(f)?;
        writeln!(f, "  {}", self.temperature_label())?;
        writeln!(f)?;

        let details: Vec<String> = self
            .details
            .iter()
            .map(|d| format!("{} {} {} {}", d.icon, d.label, d.value, d.unit))
            .collect();
        write!(f, "{}", details.join("   "))?;

        if let Some(hourly) = &self.hourly {
            writeln!(f)?;
            writeln!(f)?;
            writeln!(f, "Hourly Forecast")?;
            let cells: Vec<String> =
                hourly.iter().map(|h| format!("{:>8} {:>3}°", h.time, h.temperature)).collect();
            write!(f, "{}", cells.join("\n"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app::Action,
        error::AppError,
        model::{Coordinates, CurrentConditions, SelectedLocation},
    };
    use chrono::{DateTime, Duration, FixedOffset};

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2025-08-30T10:00:00+02:00").unwrap()
    }

    fn snapshot_with_hours(offsets_h: &[i64]) -> WeatherSnapshot {
        let mut current = CurrentConditions::empty_at(now());
        current.temperature_c = 18.3;
        current.rain_mm = 0.4;
        current.humidity_pct = 63.6;
        current.wind_speed_kph = 11.5;

        let hourly = offsets_h
            .iter()
            .map(|h| HourlyForecastPoint {
                timestamp: now() + Duration::hours(*h),
                temperature_c: 18.0 + *h as f64 * 0.6,
            })
            .collect();
        WeatherSnapshot { current, hourly }
    }

    fn ready(card: WeatherCard) -> CardView {
        match card {
            WeatherCard::Ready(view) => view,
            WeatherCard::Loading => panic!("expected a ready card"),
        }
    }

    #[test]
    fn absent_snapshot_renders_loading() {
        assert_eq!(render_card(None, Some("Paris")), WeatherCard::Loading);
        assert_eq!(WeatherCard::Loading.to_string(), "Loading weather data...");
    }

    #[test]
    fn hourly_keeps_only_points_strictly_after_now() {
        let snapshot = snapshot_with_hours(&[-1, 0, 1, 2]);
        let upcoming: Vec<_> = upcoming_hours(&snapshot).iter().map(|p| p.timestamp).collect();
        assert_eq!(upcoming, vec![now() + Duration::hours(1), now() + Duration::hours(2)]);

        let card = ready(render_card(Some(&snapshot), None));
        let times: Vec<_> = card.hourly.unwrap().into_iter().map(|c| c.time).collect();
        assert_eq!(times, vec!["11:00 AM", "12:00 PM"]);
    }

    #[test]
    fn hourly_is_capped_at_six() {
        let snapshot = snapshot_with_hours(&(1..=24).collect::<Vec<_>>());
        let card = ready(render_card(Some(&snapshot), None));
        assert_eq!(card.hourly.unwrap().len(), HOURLY_SLOTS);
    }

    #[test]
    fn hourly_section_omitted_when_nothing_remains() {
        let snapshot = snapshot_with_hours(&[-2, -1, 0]);
        let card = ready(render_card(Some(&snapshot), Some("Paris")));
        assert_eq!(card.hourly, None);
        assert!(!card.to_string().contains("Hourly Forecast"));
    }

    #[test]
    fn values_are_rounded_for_display() {
        let card = ready(render_card(Some(&snapshot_with_hours(&[])), Some("Paris, France")));
        assert_eq!(card.temperature_label(), "18°C");
        let values: Vec<i64> = card.details.iter().map(|d| d.value).collect();
        assert_eq!(values, vec![0, 64, 12, 0]);
        assert_eq!(card.title, "Paris, France");
        assert_eq!(card.date, "Saturday, August 30, 2025");
        assert_eq!(card.time, "10:00 AM");
    }

    #[test]
    fn halves_round_towards_positive_infinity() {
        assert_eq!(round(2.5), 3);
        assert_eq!(round(-2.5), -2);
        assert_eq!(round(-2.6), -3);

        let mut snapshot = snapshot_with_hours(&[]);
        snapshot.current.temperature_c = -2.5;
        let card = ready(render_card(Some(&snapshot), None));
        assert_eq!(card.temperature_label(), "-2°C");
    }

    #[test]
    fn absent_fields_render_defaults_with_day_theme() {
        let snapshot =
            WeatherSnapshot { current: CurrentConditions::empty_at(now()), hourly: Vec::new() };
        let card = ready(render_card(Some(&snapshot), None));

        assert_eq!(card.temperature_label(), "0°C");
        assert_eq!(card.theme, Theme::Day);
        assert_eq!(card.title, "Unknown Location");

        let text = card.to_string();
        assert!(text.contains("Humidity 0 %"));
        assert!(text.contains("Wind 0 km/h"));
        assert!(text.contains("Snowfall 0 cm"));
    }

    #[test]
    fn night_theme_follows_is_day() {
        let mut snapshot = snapshot_with_hours(&[]);
        snapshot.current.is_day = false;
        let card = ready(render_card(Some(&snapshot), None));
        assert_eq!(card.theme, Theme::Night);
        assert!(card.to_string().starts_with("🌙"));
    }

    #[test]
    fn source_line_labels_and_hides_while_loading() {
        assert_eq!(source_label(LocationSource::Gps), "device location");
        assert_eq!(
            source_line(Some(LocationSource::Ip), false).as_deref(),
            Some("Weather forecast based on your IP address")
        );
        assert_eq!(source_line(Some(LocationSource::Search), true), None);
        assert_eq!(source_line(None, false), None);
    }

    #[test]
    fn app_screen_shows_error_only_when_settled() {
        let mut state = AppState::new();
        state.apply(Action::Mounted);
        state.apply(Action::LocationFailed);

        let screen = render_app(&state);
        assert!(screen.contains(&AppError::LocationUnavailable.to_string()));
        assert!(screen.contains(LOADING_MESSAGE));

        state.apply(Action::SearchSelected(SelectedLocation {
            coordinates: Coordinates::new(35.68, 139.69),
            display_name: "Tokyo, Japan".into(),
        }));
        let screen = render_app(&state);
        assert!(screen.starts_with("⏳"));
        assert!(!screen.contains("⚠️"));
        assert!(!screen.contains("based on your"));
    }
}
