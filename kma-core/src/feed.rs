use anyhow::anyhow;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::fmt::Debug;
use tracing::debug;

use crate::{
    Config,
    feed::kma::KmaClient,
    grid::{Coordinate, GridCell, project},
    issue_time::{IssueTime, select_forecast_issue_time, select_observation_issue_time},
    model::{CurrentWeather, Forecast, ObservationItem, RawFeedItem},
    normalize::normalize_for_cell,
    observation::current_from_observation,
};

pub mod kma;

pub use kma::FeedEnvelope;

/// Source of raw feed rows for one grid cell and issue time.
#[async_trait]
pub trait FeedSource: Send + Sync + Debug {
    /// Short-term (village) forecast rows.
    async fn fetch_forecast(
        &self,
        cell: GridCell,
        issue: IssueTime,
    ) -> anyhow::Result<Vec<RawFeedItem>>;

    /// Ultra-short-term observation rows.
    async fn fetch_observation(
        &self,
        cell: GridCell,
        issue: IssueTime,
    ) -> anyhow::Result<Vec<ObservationItem>>;
}

/// Construct the KMA client from config.
pub fn source_from_config(config: &Config) -> anyhow::Result<Box<dyn FeedSource>> {
    let service_key = config.service_key().ok_or_else(|| {
        anyhow!(
            "No KMA service key configured.\n\
             Hint: run `kma configure` or set {}.",
            crate::config::SERVICE_KEY_ENV
        )
    })?;

    let client = KmaClient::new(service_key).with_base_url(config.base_url());
    Ok(Box::new(client))
}

/// Project, pick the forecast issue time, fetch, and normalize.
///
/// Transport failures are `Err`; a response too sparse to describe the
/// current instant is `Ok(None)`.
pub async fn fetch_forecast(
    source: &dyn FeedSource,
    coordinate: Coordinate,
    now: NaiveDateTime,
) -> anyhow::Result<Option<Forecast>> {
    let cell = project(coordinate);
    let issue = select_forecast_issue_time(now);
    debug!(%cell, %issue, "fetching short-term forecast");

    let items = source.fetch_forecast(cell, issue).await?;
    Ok(normalize_for_cell(&items, cell, now))
}

/// Current conditions from the nowcast, completed by the short-term forecast.
pub async fn fetch_current_observation(
    source: &dyn FeedSource,
    coordinate: Coordinate,
    now: NaiveDateTime,
) -> anyhow::Result<Option<CurrentWeather>> {
    let cell = project(coordinate);
    let observation_issue = select_observation_issue_time(now);
    let forecast_issue = select_forecast_issue_time(now);
    debug!(%cell, %observation_issue, %forecast_issue, "fetching nowcast");

    let (observations, forecast) = tokio::try_join!(
        source.fetch_observation(cell, observation_issue),
        source.fetch_forecast(cell, forecast_issue),
    )?;

    let observations: Vec<ObservationItem> =
        observations.into_iter().filter(|item| item.belongs_to(cell)).collect();
    let forecast: Vec<RawFeedItem> =
        forecast.into_iter().filter(|item| item.belongs_to(cell)).collect();

    Ok(current_from_observation(&observations, &forecast, observation_issue.date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, error::FeedError, model::WeatherCondition};
    use std::sync::Mutex;

    /// In-memory source that records the issue times it was asked for.
    #[derive(Debug, Default)]
    struct StaticSource {
        forecast: Vec<RawFeedItem>,
        observation: Vec<ObservationItem>,
        fail: bool,
        requests: Mutex<Vec<(GridCell, IssueTime)>>,
    }

    #[async_trait]
    impl FeedSource for StaticSource {
        async fn fetch_forecast(
            &self,
            cell: GridCell,
            issue: IssueTime,
        ) -> anyhow::Result<Vec<RawFeedItem>> {
            self.requests.lock().unwrap().push((cell, issue));
            if self.fail {
                return Err(FeedError::ResultCode {
                    endpoint: "getVilageFcst",
                    code: "03".into(),
                    message: "NO_DATA".into(),
                }
                .into());
            }
            Ok(self.forecast.clone())
        }

        async fn fetch_observation(
            &self,
            cell: GridCell,
            issue: IssueTime,
        ) -> anyhow::Result<Vec<ObservationItem>> {
            self.requests.lock().unwrap().push((cell, issue));
            Ok(self.observation.clone())
        }
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn row(category: &str, time: &str, value: &str) -> RawFeedItem {
        RawFeedItem {
            issue_date: "20240315".into(),
            issue_time: "1100".into(),
            category: category.into(),
            forecast_date: "20240315".into(),
            forecast_time: time.into(),
            value: value.into(),
            nx: Some(60),
            ny: Some(127),
        }
    }

    fn complete_hour(time: &str) -> Vec<RawFeedItem> {
        vec![
            row("TMP", time, "11"),
            row("SKY", time, "3"),
            row("PTY", time, "0"),
            row("POP", time, "30"),
            row("PCP", time, "강수없음"),
            row("SNO", time, "적설없음"),
            row("REH", time, "55"),
            row("WSD", time, "1.8"),
            row("VEC", time, "120"),
        ]
    }

    fn seoul() -> Coordinate {
        Coordinate::new(37.5665, 126.978)
    }

    #[tokio::test]
    async fn fetch_forecast_projects_and_selects_issue_time() {
        let source = StaticSource { forecast: complete_hour("1300"), ..Default::default() };

        let forecast = fetch_forecast(&source, seoul(), at("2024-03-15 13:05"))
            .await
            .unwrap()
            .expect("complete data should normalize");

        assert_eq!(forecast.current.temperature, 11);
        assert_eq!(forecast.current.condition, WeatherCondition::Clouds);
        assert_eq!(forecast.hourly.len(), 1);

        let requests = source.requests.lock().unwrap();
        let (cell, issue) = requests[0];
        assert_eq!(cell, GridCell { x: 60, y: 127 });
        assert_eq!(issue.base_date(), "20240315");
        assert_eq!(issue.base_time(), "1100");
    }

    #[tokio::test]
    async fn sparse_response_is_none_not_error() {
        let source = StaticSource { forecast: vec![row("TMP", "1300", "11")], ..Default::default() };

        let result = fetch_forecast(&source, seoul(), at("2024-03-15 13:05")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn transport_failure_is_error() {
        let source = StaticSource { fail: true, ..Default::default() };

        let err = fetch_forecast(&source, seoul(), at("2024-03-15 13:05")).await.unwrap_err();
        assert!(err.downcast_ref::<FeedError>().is_some());
    }

    #[tokio::test]
    async fn nowcast_uses_both_cadences() {
        let observation = vec![ObservationItem {
            issue_date: "20240315".into(),
            issue_time: "0000".into(),
            category: "T1H".into(),
            value: "4.4".into(),
            nx: Some(60),
            ny: Some(127),
        }];
        // Before 00:10 the nowcast is yesterday's, and so is the forecast day.
        let mut forecast = complete_hour("0100");
        forecast.push(RawFeedItem {
            forecast_date: "20240314".into(),
            forecast_time: "2300".into(),
            ..row("SKY", "2300", "4")
        });
        forecast.push(RawFeedItem {
            forecast_date: "20240314".into(),
            ..row("TMX", "1500", "9.0")
        });
        let source = StaticSource { forecast, observation, ..Default::default() };

        let current = fetch_current_observation(&source, seoul(), at("2024-03-15 00:05"))
            .await
            .unwrap()
            .expect("nowcast has a temperature");
        assert_eq!(current.temperature, 4);
        assert_eq!(current.condition, WeatherCondition::Clouds);
        assert_eq!(current.temp_max, 9);
        assert_eq!(current.precipitation_probability, 0);

        let requests = source.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|(_, issue)| issue.to_string() == "20240314 2300"));
    }

    #[test]
    fn source_from_config_errors_when_missing_key() {
        let cfg = Config::default();
        if cfg.service_key().is_some() {
            // A key in the environment makes this case unreachable.
            return;
        }
        let err = source_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("No KMA service key configured"));
    }

    #[test]
    fn source_from_config_works_when_key_set() {
        let mut cfg = Config::default();
        cfg.set_service_key("KEY".into());
        assert!(source_from_config(&cfg).is_ok());
    }
}
