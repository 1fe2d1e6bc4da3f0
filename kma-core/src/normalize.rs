//! Reassembly of the flat feed rows into typed records.
//!
//! The feed sends one row per (category, forecast instant). Rows for the same
//! instant are merged into an [`HourlyAccumulator`] and only promoted to an
//! [`HourlyForecast`] once every required category is present.

use chrono::{NaiveDateTime, Timelike};
use std::collections::BTreeMap;

use crate::{
    grid::GridCell,
    model::{Category, CurrentWeather, Forecast, HourlyForecast, RawFeedItem, WeatherCondition},
    sentinel::{parse_int, parse_number, parse_precipitation, parse_snow, round_half_up},
};

/// Forecast time used when today has no temperature rows at all.
const DEFAULT_FORECAST_TIME: &str = "2300";

/// Upper bound on the hourly sequence.
pub const MAX_HOURLY_ENTRIES: usize = 24;

/// Build current conditions and the hourly forecast from a feed response.
///
/// Returns `None` when `items` is empty or when the instant closest to `now`
/// has no row for one of TMP, SKY, PTY, WSD or REH. A row whose value is not
/// a number still counts as present and reads as 0.
pub fn normalize(items: &[RawFeedItem], now: NaiveDateTime) -> Option<Forecast> {
    let rows: Vec<&RawFeedItem> = items.iter().collect();
    normalize_rows(&rows, now)
}

/// Like [`normalize`], restricted to rows reported for `cell`.
pub fn normalize_for_cell(
    items: &[RawFeedItem],
    cell: GridCell,
    now: NaiveDateTime,
) -> Option<Forecast> {
    let rows: Vec<&RawFeedItem> = items.iter().filter(|item| item.belongs_to(cell)).collect();
    normalize_rows(&rows, now)
}

fn normalize_rows(rows: &[&RawFeedItem], now: NaiveDateTime) -> Option<Forecast> {
    if rows.is_empty() {
        return None;
    }

    let today = now.format("%Y%m%d").to_string();
    let current_hour = (now.hour() * 100) as i32;

    let current = current_weather(rows, &today, current_hour)?;
    let hourly = hourly_forecast(rows, &today);

    Some(Forecast { current, hourly })
}

/// Today's TMP forecast time nearest to `current_hour` (both `HHMM` integers).
/// Ties keep the earliest row in feed order.
fn closest_forecast_time<'a>(rows: &[&'a RawFeedItem], today: &str, current_hour: i32) -> &'a str {
    let mut closest = DEFAULT_FORECAST_TIME;
    let mut min_diff = i32::MAX;

    let candidates = rows
        .iter()
        .copied()
        .filter(|item| item.forecast_date == today && item.is(&Category::Tmp));

    for item in candidates {
        let Some(time) = parse_int(&item.forecast_time) else {
            continue;
        };
        let diff = (time - current_hour).abs();
        if diff < min_diff {
            min_diff = diff;
            closest = &item.forecast_time;
        }
    }

    closest
}

fn first<'a>(rows: &[&'a RawFeedItem], category: &Category) -> Option<&'a RawFeedItem> {
    rows.iter().copied().find(|item| item.is(category))
}

fn current_weather(rows: &[&RawFeedItem], today: &str, current_hour: i32) -> Option<CurrentWeather> {
    let time = closest_forecast_time(rows, today, current_hour);
    let instant: Vec<&RawFeedItem> = rows
        .iter()
        .copied()
        .filter(|item| item.forecast_date == today && item.forecast_time == time)
        .collect();

    let value = |category: Category| first(&instant, &category).map(|item| item.value.as_str());

    let temperature = parse_number(value(Category::Tmp)?).unwrap_or(0.0);
    let sky = value(Category::Sky)?;
    let pty = value(Category::Pty)?;
    let wind_speed = parse_number(value(Category::Wsd)?).unwrap_or(0.0);
    let humidity = parse_int(value(Category::Reh)?).unwrap_or(0);

    // POP is published less often than TMP; fall back to any row for today.
    let precipitation_probability = first(&instant, &Category::Pop)
        .or_else(|| {
            rows.iter()
                .copied()
                .find(|item| item.is(&Category::Pop) && item.forecast_date == today)
        })
        .and_then(|item| parse_int(&item.value))
        .unwrap_or(0);

    let daily_extreme = |category: Category| {
        first(rows, &category)
            .and_then(|item| parse_number(&item.value))
            .map(round_half_up)
            .unwrap_or(0)
    };

    let condition = WeatherCondition::from_codes(pty, sky);

    Some(CurrentWeather {
        temperature: round_half_up(temperature),
        temp_min: daily_extreme(Category::Tmn),
        temp_max: daily_extreme(Category::Tmx),
        humidity,
        wind_speed,
        precipitation_probability,
        condition,
        description: condition.label().to_string(),
    })
}

/// Fields of one forecast instant collected so far.
#[derive(Debug, Default)]
struct HourlyAccumulator {
    temperature: Option<i32>,
    sky: Option<String>,
    pty: Option<String>,
    precipitation_probability: Option<i32>,
    precipitation: Option<f64>,
    snow: Option<f64>,
    humidity: Option<i32>,
    wind_speed: Option<f64>,
    wind_direction: Option<i32>,
}

impl HourlyAccumulator {
    /// Later rows of the same category replace earlier ones. Values that do
    /// not parse are kept as 0 so the category still counts as present.
    fn absorb(&mut self, item: &RawFeedItem) {
        let value = item.value.as_str();
        let int = || parse_int(value).unwrap_or(0);
        match item.category() {
            Category::Tmp => {
                self.temperature = Some(parse_number(value).map(round_half_up).unwrap_or(0))
            }
            Category::Sky => self.sky = Some(value.trim().to_string()),
            Category::Pty => self.pty = Some(value.trim().to_string()),
            Category::Pop => self.precipitation_probability = Some(int()),
            Category::Pcp => self.precipitation = Some(parse_precipitation(value)),
            Category::Sno => self.snow = Some(parse_snow(value)),
            Category::Reh => self.humidity = Some(int()),
            Category::Wsd => self.wind_speed = Some(parse_number(value).unwrap_or(0.0)),
            Category::Vec => self.wind_direction = Some(int()),
            _ => {}
        }
    }

    /// Promote to a complete forecast, or `None` if any category is missing.
    fn finish(self, date: String, hour: u32, today: &str) -> Option<HourlyForecast> {
        let sky = self.sky?;
        let pty = self.pty?;

        Some(HourlyForecast {
            label: format!("{hour:02}시"),
            temperature: self.temperature?,
            condition: WeatherCondition::from_codes(&pty, &sky),
            precipitation_probability: self.precipitation_probability?,
            precipitation: self.precipitation?,
            snow: self.snow?,
            humidity: self.humidity?,
            wind_speed: self.wind_speed?,
            wind_direction: self.wind_direction?,
            is_today: date == today,
            forecast_date: date,
            forecast_hour: hour,
        })
    }
}

fn forecast_hour(time: &str) -> Option<u32> {
    time.get(..2)?.parse().ok()
}

fn hourly_forecast(rows: &[&RawFeedItem], today: &str) -> Vec<HourlyForecast> {
    // BTreeMap keeps keys ordered by (date, hour), which is the output order.
    let mut groups: BTreeMap<(String, u32), HourlyAccumulator> = BTreeMap::new();

    for item in rows {
        let Some(hour) = forecast_hour(&item.forecast_time) else {
            continue;
        };
        groups
            .entry((item.forecast_date.clone(), hour))
            .or_default()
            .absorb(item);
    }

    groups
        .into_iter()
        .filter_map(|((date, hour), acc)| acc.finish(date, hour, today))
        .take(MAX_HOURLY_ENTRIES)
        .collect()
}
