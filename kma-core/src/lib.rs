//! Core library for the `kma` CLI.
//!
//! This crate defines:
//! - Projection of coordinates onto the KMA forecast grid
//! - Issue-time selection for the short-term and ultra-short-term feeds
//! - Normalization of flat feed rows into current and hourly records
//! - A thin HTTP client for the feed, plus configuration handling
//!
//! The projection, issue-time and normalization modules are pure and
//! synchronous; only [`feed`] performs I/O.

pub mod config;
pub mod error;
pub mod feed;
pub mod grid;
pub mod issue_time;
pub mod model;
pub mod normalize;
pub mod observation;
pub mod sentinel;

pub use config::{Config, SavedLocation};
pub use error::FeedError;
pub use feed::{FeedSource, fetch_current_observation, fetch_forecast, source_from_config};
pub use grid::{Coordinate, GridCell, project};
pub use issue_time::{
    Cadence, IssueTime, kst_now, select_forecast_issue_time, select_observation_issue_time,
};
pub use model::{
    Category, CurrentWeather, Forecast, HourlyForecast, ObservationItem, RawFeedItem,
    WeatherCondition,
};
pub use normalize::{normalize, normalize_for_cell};
pub use observation::current_from_observation;
