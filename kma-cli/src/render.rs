//! Plain-text views of core results.

use chrono::{NaiveDate, NaiveDateTime};
use kma_core::{Coordinate, CurrentWeather, Forecast, GridCell, HourlyForecast, IssueTime};
use std::fmt;

pub const NO_DATA: &str = "No forecast data available for this location and time.";

const COMPASS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// 16-point compass label for a direction in degrees.
pub fn compass(degrees: i32) -> &'static str {
    let index = ((f64::from(degrees.rem_euclid(360)) + 11.25) / 22.5) as usize % COMPASS.len();
    COMPASS[index]
}

pub struct GridView {
    pub coordinate: Coordinate,
    pub cell: GridCell,
}

impl fmt::Display for GridView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.4}, {:.4} -> {}",
            self.coordinate.latitude, self.coordinate.longitude, self.cell
        )
    }
}

pub struct IssueTimesView {
    pub now: NaiveDateTime,
    pub forecast: IssueTime,
    pub observation: IssueTime,
}

impl fmt::Display for IssueTimesView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "now (KST):             {}", self.now.format("%Y-%m-%d %H:%M"))?;
        writeln!(f, "short-term forecast:   {}", self.forecast)?;
        writeln!(f, "ultra-short-term obs:  {}", self.observation)
    }
}

pub struct CurrentView<'a> {
    pub name: Option<&'a str>,
    pub current: &'a CurrentWeather,
}

impl fmt::Display for CurrentView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.current;
        if let Some(name) = self.name {
            writeln!(f, "{name}")?;
        }
        writeln!(f, "{}°C  {} ({})", c.temperature, c.description, c.condition)?;
        writeln!(f, "  min/max:        {}°C / {}°C", c.temp_min, c.temp_max)?;
        writeln!(f, "  humidity:       {}%", c.humidity)?;
        writeln!(f, "  wind:           {:.1} m/s", c.wind_speed)?;
        writeln!(f, "  precipitation:  {}%", c.precipitation_probability)
    }
}

/// Day label for a `YYYYMMDD` forecast date relative to `today`.
fn day_label(forecast_date: &str, today: NaiveDate) -> String {
    let Ok(date) = NaiveDate::parse_from_str(forecast_date, "%Y%m%d") else {
        return forecast_date.to_string();
    };
    match (date - today).num_days() {
        0 => "오늘".to_string(),
        1 => "내일".to_string(),
        2 => "모레".to_string(),
        _ => date.format("%m/%d").to_string(),
    }
}

struct HourlyRow<'a> {
    hour: &'a HourlyForecast,
    today: NaiveDate,
}

impl fmt::Display for HourlyRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = self.hour;
        let day = day_label(&h.forecast_date, self.today);
        write!(
            f,
            "{day} {:<4} {:>4}°C  {:<6}  POP {:>3}%  {:>5.1}mm  {:>4.1}cm  REH {:>3}%  {:>4.1}m/s {:<3}",
            h.label,
            h.temperature,
            h.condition,
            h.precipitation_probability,
            h.precipitation,
            h.snow,
            h.humidity,
            h.wind_speed,
            compass(h.wind_direction),
        )
    }
}

pub struct ForecastView<'a> {
    pub name: Option<&'a str>,
    pub forecast: &'a Forecast,
    pub today: NaiveDate,
}

impl fmt::Display for ForecastView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", CurrentView { name: self.name, current: &self.forecast.current })?;

        if self.forecast.hourly.is_empty() {
            return Ok(());
        }
        writeln!(f)?;
        for hour in &self.forecast.hourly {
            writeln!(f, "{}", HourlyRow { hour, today: self.today })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kma_core::WeatherCondition;

    fn current() -> CurrentWeather {
        CurrentWeather {
            temperature: 12,
            temp_min: 3,
            temp_max: 15,
            humidity: 40,
            wind_speed: 2.0,
            precipitation_probability: 20,
            condition: WeatherCondition::Clear,
            description: "맑음".into(),
        }
    }

    fn hour(forecast_date: &str, is_today: bool) -> HourlyForecast {
        HourlyForecast {
            label: "14시".into(),
            temperature: 12,
            condition: WeatherCondition::Rain,
            precipitation_probability: 60,
            precipitation: 3.0,
            snow: 0.0,
            humidity: 80,
            wind_speed: 4.5,
            wind_direction: 225,
            is_today,
            forecast_date: forecast_date.into(),
            forecast_hour: 14,
        }
    }

    #[test]
    fn compass_points() {
        assert_eq!(compass(0), "N");
        assert_eq!(compass(11), "N");
        assert_eq!(compass(12), "NNE");
        assert_eq!(compass(90), "E");
        assert_eq!(compass(225), "SW");
        assert_eq!(compass(359), "N");
        assert_eq!(compass(360), "N");
        assert_eq!(compass(-90), "W");
    }

    #[test]
    fn current_view_includes_name_and_label() {
        let c = current();
        let text = CurrentView { name: Some("Seoul"), current: &c }.to_string();
        assert!(text.starts_with("Seoul\n"));
        assert!(text.contains("12°C  맑음 (clear)"));
        assert!(text.contains("3°C / 15°C"));
    }

    #[test]
    fn forecast_view_lists_hours() {
        let hourly = vec![
            hour("20240315", true),
            hour("20240316", false),
            hour("20240317", false),
            hour("20240318", false),
        ];
        let forecast = Forecast { current: current(), hourly };
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let text = ForecastView { name: None, forecast: &forecast, today }.to_string();
        let rows: Vec<&str> = text.lines().filter(|l| l.contains("14시")).collect();
        assert_eq!(rows.len(), 4);
        assert!(rows[0].starts_with("오늘"));
        assert!(rows[1].starts_with("내일"));
        assert!(rows[2].starts_with("모레"));
        assert!(rows[3].starts_with("03/18"));
        assert!(rows[0].contains("3.0mm"));
        assert!(rows[0].contains("SW"));
    }

    #[test]
    fn grid_view() {
        let coordinate = Coordinate::new(38.0, 126.0);
        let text = GridView { coordinate, cell: GridCell { x: 43, y: 136 } }.to_string();
        assert_eq!(text, "38.0000, 126.0000 -> nx=43 ny=136");
    }
}
