use anyhow::{Context, Result, anyhow};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use inquire::{Confirm, CustomType, Password, PasswordDisplayMode, Text};
use kma_core::{
    Config, Coordinate, FeedError, RawFeedItem, SavedLocation, feed::FeedEnvelope, fetch_current_observation,
    fetch_forecast, kst_now, normalize, project, select_forecast_issue_time,
    select_observation_issue_time, source_from_config,
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::render;

/// Formats accepted by `--at`, interpreted as Korean local time.
const AT_FORMATS: &[&str] = &["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y%m%d%H%M"];

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "kma", version, about = "KMA village forecast CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the service key and a default location.
    Configure,

    /// Print the forecast grid cell for a coordinate.
    Grid {
        #[arg(allow_hyphen_values = true)]
        latitude: f64,
        #[arg(allow_hyphen_values = true)]
        longitude: f64,
    },

    /// Print the issue times that would be requested.
    IssueTime {
        /// Wall-clock time in KST, e.g. "2024-03-15 02:09"; defaults to now.
        #[arg(long)]
        at: Option<String>,
    },

    /// Fetch and show current conditions and the hourly forecast.
    Show {
        /// Latitude; the configured default location is used when absent.
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        #[arg(long)]
        at: Option<String>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,

        /// Use the hourly observation feed for current conditions.
        #[arg(long)]
        observed: bool,
    },

    /// Normalize a saved getVilageFcst response without network access.
    Normalize {
        /// Full response envelope or a bare array of items.
        file: PathBuf,

        #[arg(long)]
        at: Option<String>,

        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Grid { latitude, longitude } => {
                let coordinate = Coordinate::new(latitude, longitude);
                println!("{}", render::GridView { coordinate, cell: project(coordinate) });
                Ok(())
            }
            Command::IssueTime { at } => {
                let now = resolve_now(at.as_deref())?;
                print!(
                    "{}",
                    render::IssueTimesView {
                        now,
                        forecast: select_forecast_issue_time(now),
                        observation: select_observation_issue_time(now),
                    }
                );
                Ok(())
            }
            Command::Show { lat, lon, at, json, observed } => {
                show(lat.zip(lon), at.as_deref(), json, observed).await
            }
            Command::Normalize { file, at, json } => normalize_file(&file, at.as_deref(), json),
        }
    }
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let key = Password::new("KMA service key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .with_help_message("As issued by data.go.kr; leave empty to keep the current key")
        .prompt()?;
    if !key.trim().is_empty() {
        config.set_service_key(key.trim().to_string());
    }

    let set_location = Confirm::new("Set a default location?")
        .with_default(config.default_location.is_none())
        .prompt()?;
    if set_location {
        let name = Text::new("Location name:").prompt()?;
        let latitude = CustomType::<f64>::new("Latitude:")
            .with_error_message("Please type a number")
            .prompt()?;
        let longitude = CustomType::<f64>::new("Longitude:")
            .with_error_message("Please type a number")
            .prompt()?;
        config.set_default_location(SavedLocation { name, latitude, longitude });
    }

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn show(
    coordinate: Option<(f64, f64)>,
    at: Option<&str>,
    json: bool,
    observed: bool,
) -> Result<()> {
    let config = Config::load()?;

    let (name, coordinate) = match coordinate {
        Some((lat, lon)) => (None, Coordinate::new(lat, lon)),
        None => {
            let location = config.default_location()?;
            (Some(location.name.clone()), location.coordinate())
        }
    };

    let now = resolve_now(at)?;
    let source = source_from_config(&config)?;
    info!(cell = %project(coordinate), %now, observed, "fetching weather");

    if observed {
        let Some(current) = fetch_current_observation(source.as_ref(), coordinate, now)
            .await
            .map_err(explain_feed_error)?
        else {
            println!("{}", render::NO_DATA);
            return Ok(());
        };
        if json {
            println!("{}", serde_json::to_string_pretty(&current)?);
        } else {
            print!("{}", render::CurrentView { name: name.as_deref(), current: &current });
        }
        return Ok(());
    }

    match fetch_forecast(source.as_ref(), coordinate, now).await.map_err(explain_feed_error)? {
        Some(forecast) if json => println!("{}", serde_json::to_string_pretty(&forecast)?),
        Some(forecast) => print!(
            "{}",
            render::ForecastView { name: name.as_deref(), forecast: &forecast, today: now.date() }
        ),
        None => println!("{}", render::NO_DATA),
    }
    Ok(())
}

/// Add a hint when retrying cannot help, e.g. an unregistered key.
fn explain_feed_error(err: anyhow::Error) -> anyhow::Error {
    let permanent = err.downcast_ref::<FeedError>().is_some_and(FeedError::is_permanent);
    if permanent {
        err.context("The feed rejected the request.\nHint: check the service key with `kma configure`.")
    } else {
        err
    }
}

fn normalize_file(file: &Path, at: Option<&str>, json: bool) -> Result<()> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("Failed to read feed file: {}", file.display()))?;
    let items = parse_items(&text)
        .with_context(|| format!("Failed to parse feed file: {}", file.display()))?;
    let now = resolve_now(at)?;

    match normalize(&items, now) {
        Some(forecast) if json => println!("{}", serde_json::to_string_pretty(&forecast)?),
        Some(forecast) => print!(
            "{}",
            render::ForecastView { name: None, forecast: &forecast, today: now.date() }
        ),
        None => println!("{}", render::NO_DATA),
    }
    Ok(())
}

/// Accept either the full response envelope or a bare item array.
fn parse_items(text: &str) -> Result<Vec<RawFeedItem>> {
    if let Ok(items) = serde_json::from_str::<Vec<RawFeedItem>>(text) {
        return Ok(items);
    }
    let envelope: FeedEnvelope =
        serde_json::from_str(text).context("Expected a KMA response envelope or an item array")?;
    envelope.into_items("getVilageFcst")
}

/// `--at` when given, otherwise the current time in Korea.
fn resolve_now(at: Option<&str>) -> Result<NaiveDateTime> {
    let Some(at) = at else {
        return Ok(kst_now());
    };

    AT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(at.trim(), fmt).ok())
        .ok_or_else(|| anyhow!("Could not parse time '{at}'. Expected e.g. \"2024-03-15 14:30\"."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_show_with_negative_coordinates() {
        let cli = Cli::try_parse_from(["kma", "show", "--lat", "-33.9", "--lon", "151.2", "--json"])
            .unwrap();
        match cli.command {
            Command::Show { lat, lon, json, observed, .. } => {
                assert_eq!(lat, Some(-33.9));
                assert_eq!(lon, Some(151.2));
                assert!(json);
                assert!(!observed);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn show_requires_both_coordinates() {
        assert!(Cli::try_parse_from(["kma", "show", "--lat", "37.5"]).is_err());
    }

    #[test]
    fn resolves_explicit_time() {
        let now = resolve_now(Some("2024-03-15 02:09")).unwrap();
        assert_eq!(now.format("%Y%m%d%H%M").to_string(), "202403150209");

        let now = resolve_now(Some("2024-03-15T23:59")).unwrap();
        assert_eq!(now.format("%H:%M").to_string(), "23:59");

        assert!(resolve_now(Some("yesterday")).is_err());
    }

    #[test]
    fn parses_bare_item_array() {
        let text = r#"[{"baseDate":"20240315","baseTime":"1400","category":"TMP",
            "fcstDate":"20240315","fcstTime":"1500","fcstValue":"12","nx":60,"ny":127}]"#;
        let items = parse_items(text).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].forecast_time, "1500");
    }

    #[test]
    fn parses_full_envelope() {
        let text = r#"{"response":{"header":{"resultCode":"00","resultMsg":"NORMAL_SERVICE"},
            "body":{"dataType":"JSON","items":{"item":[
            {"baseDate":"20240315","baseTime":"1400","category":"SKY",
             "fcstDate":"20240315","fcstTime":"1500","fcstValue":"1","nx":60,"ny":127}]},
            "pageNo":1,"numOfRows":1000,"totalCount":1}}}"#;
        let items = parse_items(text).unwrap();
        assert_eq!(items[0].category, "SKY");
    }

    #[test]
    fn permanent_feed_errors_get_a_hint() {
        let err: anyhow::Error = FeedError::ResultCode {
            endpoint: "getVilageFcst",
            code: "30".into(),
            message: "SERVICE_KEY_IS_NOT_REGISTERED_ERROR".into(),
        }
        .into();
        let text = format!("{:#}", explain_feed_error(err));
        assert!(text.contains("kma configure"));
        assert!(text.contains("result code 30"));

        let err = explain_feed_error(anyhow!("connection reset"));
        assert_eq!(err.to_string(), "connection reset");
    }

    #[test]
    fn rejects_unrelated_json() {
        assert!(parse_items(r#"{"hello": "world"}"#).is_err());
    }
}
