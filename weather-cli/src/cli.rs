use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inquire::error::InquireResult;
use inquire::{Confirm, CustomType, Select, Text};
use tracing::debug;

use weather_core::{
    AppController, Config, Coordinates, LocationResolver, PositionOptions, Providers,
    SearchInput, SearchOptions, geolocator_from_config, view::render_app,
};

/// How often to check whether a debounced search has settled.
const SEARCH_POLL: Duration = Duration::from_millis(50);

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Current weather and hourly forecast")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Locate this machine and show the weather there.
    Show,

    /// Search for a place and show the weather there.
    Search {
        /// Place name; prompted for if absent.
        query: Option<String>,
    },

    /// Edit the configuration interactively.
    Configure,
}

impl Cli {
    pub async fn run(self, config: Config) -> Result<()> {
        match self.command {
            Command::Show => show(&config).await,
            Command::Search { query } => search(&config, query).await,
            Command::Configure => {
                tokio::task::spawn_blocking(move || configure(config))
                    .await
                    .context("Configuration task panicked")?
            }
        }
    }
}

fn controller(config: &Config, providers: &Providers) -> AppController {
    let resolver = LocationResolver::new(
        geolocator_from_config(&config.geolocation),
        Arc::clone(&providers.ip_locator),
        PositionOptions::from(&config.geolocation),
    );
    AppController::new(resolver, Arc::clone(&providers.weather), Arc::clone(&providers.geocoder))
}

async fn show(config: &Config) -> Result<()> {
    let providers = Providers::from_config(config)?;
    let controller = controller(config, &providers);

    controller.mount().await.context("Weather task panicked")?;

    println!("{}", render_app(&controller.state()));
    Ok(())
}

async fn search(config: &Config, query: Option<String>) -> Result<()> {
    let providers = Providers::from_config(config)?;
    let options = SearchOptions::from(&config.search);
    let input = SearchInput::new(Arc::clone(&providers.geocoder), options);

    let query = match query {
        Some(q) => q,
        None => prompt(|| Text::new("Search for a city:").prompt()).await?,
    };

    input.input(&query);
    while input.is_search_pending() {
        tokio::time::sleep(SEARCH_POLL).await;
    }

    let view = input.view();
    let labels: Vec<String> = view.visible_suggestions().iter().map(|c| c.label()).collect();
    if labels.is_empty() {
        println!("No places found for \"{}\".", query.trim());
        return Ok(());
    }

    let choice = prompt(move || Select::new("Pick a place:", labels).raw_prompt()).await?;
    let selected = input
        .select(choice.index)
        .context("Suggestion list changed while choosing")?;
    debug!(name = %selected.display_name, coordinates = %selected.coordinates, "Selected place");

    let controller = controller(config, &providers);
    controller.select_location(selected).await.context("Weather task panicked")?;

    println!("{}", render_app(&controller.state()));
    Ok(())
}

/// Run a blocking terminal prompt on the blocking pool.
async fn prompt<T, F>(ask: F) -> Result<T>
where
    F: FnOnce() -> InquireResult<T> + Send + 'static,
    T: Send + 'static,
{
    let answer = tokio::task::spawn_blocking(ask).await.context("Prompt task panicked")??;
    Ok(answer)
}

fn configure(mut config: Config) -> Result<()> {
    config.language = Text::new("Language for place names:")
        .with_default(&config.language)
        .prompt()?;

    config.search.debounce_ms = CustomType::<u64>::new("Search debounce (ms):")
        .with_default(config.search.debounce_ms)
        .prompt()?;

    config.search.limit = CustomType::<usize>::new("Suggestions to show (1-5):")
        .with_default(config.search.limit)
        .prompt()?;

    let use_device = Confirm::new("Use a fixed device position instead of IP lookup?")
        .with_default(config.geolocation.device.is_some())
        .prompt()?;

    let position = if use_device {
        let current = config.geolocation.device;
        let latitude = CustomType::<f64>::new("Latitude:")
            .with_default(current.map_or(0.0, |c| c.latitude))
            .prompt()?;
        let longitude = CustomType::<f64>::new("Longitude:")
            .with_default(current.map_or(0.0, |c| c.longitude))
            .prompt()?;
        Some(Coordinates::new(latitude, longitude))
    } else {
        None
    };
    config.set_device_position(position);

    config.validate()?;
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[tokio::test]
    async fn prompt_does_not_stall_the_runtime() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = {
            let ticks = Arc::clone(&ticks);
            tokio::spawn(async move {
                loop {
                    ticks.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
        };

        let answer = prompt(|| {
            std::thread::sleep(Duration::from_millis(100));
            Ok("Tokyo".to_string())
        })
        .await
        .unwrap();
        ticker.abort();

        assert_eq!(answer, "Tokyo");
        assert!(ticks.load(Ordering::SeqCst) > 1);
    }
}
