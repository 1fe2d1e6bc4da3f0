//! Current conditions from the hourly nowcast.
//!
//! The ultra-short-term feed reports measured values (T1H, REH, WSD, PTY) but
//! no sky state, probability or daily extremes; those come from today's rows
//! of the short-term forecast.

use chrono::NaiveDate;

use crate::{
    model::{Category, CurrentWeather, ObservationItem, RawFeedItem, WeatherCondition},
    sentinel::{parse_int, parse_number, round_half_up},
};

/// Merge a nowcast with the short-term forecast for `today`.
///
/// `today` is the nowcast's issue date, so shortly after midnight the merge
/// reads the previous day's forecast rows.
///
/// Returns `None` when the nowcast has no T1H row. Unparseable values and
/// missing daily extremes are reported as 0, as in `normalize`.
pub fn current_from_observation(
    observations: &[ObservationItem],
    forecast_items: &[RawFeedItem],
    today: NaiveDate,
) -> Option<CurrentWeather> {
    // Repeated categories: the last row wins.
    let observed = |category: Category| {
        observations.iter().rev().find(|item| item.is(&category)).map(|item| item.value.as_str())
    };

    let temperature = parse_number(observed(Category::T1h)?).unwrap_or(0.0);
    let humidity = observed(Category::Reh).and_then(parse_int).unwrap_or(0);
    let wind_speed = observed(Category::Wsd).and_then(parse_number).unwrap_or(0.0);

    let today = today.format("%Y%m%d").to_string();
    let mut sky = "1";
    let mut forecast_pty = "0";
    let mut precipitation_probability = 0;
    let mut temp_min = 0;
    let mut temp_max = 0;

    // The last row of each category for today wins.
    for item in forecast_items.iter().filter(|item| item.forecast_date == today) {
        let value = item.value.as_str();
        match item.category() {
            Category::Tmn => temp_min = parse_number(value).map(round_half_up).unwrap_or(temp_min),
            Category::Tmx => temp_max = parse_number(value).map(round_half_up).unwrap_or(temp_max),
            Category::Sky => sky = value,
            Category::Pty => forecast_pty = value,
            Category::Pop => precipitation_probability = parse_int(value).unwrap_or(0),
            _ => {}
        }
    }

    let pty = observed(Category::Pty).unwrap_or(forecast_pty);
    let condition = WeatherCondition::from_codes(pty, sky);

    Some(CurrentWeather {
        temperature: round_half_up(temperature),
        temp_min,
        temp_max,
        humidity,
        wind_speed,
        precipitation_probability,
        condition,
        description: condition.label().to_string(),
    })
}
