use serde::{Deserialize, Serialize};
use std::fmt;

use crate::grid::GridCell;

/// Feed category codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    /// Hourly temperature (°C).
    Tmp,
    /// Daily minimum temperature.
    Tmn,
    /// Daily maximum temperature.
    Tmx,
    /// Sky state code.
    Sky,
    /// Precipitation type code.
    Pty,
    /// Precipitation probability (%).
    Pop,
    /// Hourly precipitation amount.
    Pcp,
    /// Hourly new snow.
    Sno,
    /// Relative humidity (%).
    Reh,
    /// Wind speed (m/s).
    Wsd,
    /// Wind direction (degrees).
    Vec,
    /// Observed temperature (nowcast).
    T1h,
    /// Observed hourly rainfall (nowcast).
    Rn1,
    Other(String),
}

impl Category {
    pub fn code(&self) -> &str {
        match self {
            Category::Tmp => "TMP",
            Category::Tmn => "TMN",
            Category::Tmx => "TMX",
            Category::Sky => "SKY",
            Category::Pty => "PTY",
            Category::Pop => "POP",
            Category::Pcp => "PCP",
            Category::Sno => "SNO",
            Category::Reh => "REH",
            Category::Wsd => "WSD",
            Category::Vec => "VEC",
            Category::T1h => "T1H",
            Category::Rn1 => "RN1",
            Category::Other(code) => code,
        }
    }
}

impl From<&str> for Category {
    fn from(code: &str) -> Self {
        match code {
            "TMP" => Category::Tmp,
            "TMN" => Category::Tmn,
            "TMX" => Category::Tmx,
            "SKY" => Category::Sky,
            "PTY" => Category::Pty,
            "POP" => Category::Pop,
            "PCP" => Category::Pcp,
            "SNO" => Category::Sno,
            "REH" => Category::Reh,
            "WSD" => Category::Wsd,
            "VEC" => Category::Vec,
            "T1H" => Category::T1h,
            "RN1" => Category::Rn1,
            other => Category::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One (category, forecast instant) row of the short-term forecast feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFeedItem {
    #[serde(rename = "baseDate")]
    pub issue_date: String,
    #[serde(rename = "baseTime")]
    pub issue_time: String,
    pub category: String,
    #[serde(rename = "fcstDate")]
    pub forecast_date: String,
    #[serde(rename = "fcstTime")]
    pub forecast_time: String,
    #[serde(rename = "fcstValue")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nx: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ny: Option<i32>,
}

impl RawFeedItem {
    pub fn category(&self) -> Category {
        Category::from(self.category.as_str())
    }

    pub fn is(&self, category: &Category) -> bool {
        self.category == category.code()
    }

    /// Rows without grid fields are assumed to belong to the queried cell.
    pub fn belongs_to(&self, cell: GridCell) -> bool {
        self.nx.is_none_or(|x| x == cell.x) && self.ny.is_none_or(|y| y == cell.y)
    }
}

/// One category of the ultra-short-term observation feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationItem {
    #[serde(rename = "baseDate")]
    pub issue_date: String,
    #[serde(rename = "baseTime")]
    pub issue_time: String,
    pub category: String,
    #[serde(rename = "obsrValue")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nx: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ny: Option<i32>,
}

impl ObservationItem {
    pub fn is(&self, category: &Category) -> bool {
        self.category == category.code()
    }

    pub fn belongs_to(&self, cell: GridCell) -> bool {
        self.nx.is_none_or(|x| x == cell.x) && self.ny.is_none_or(|y| y == cell.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCondition {
    Clear,
    Clouds,
    Rain,
    Storm,
    Snow,
    Mist,
}

impl WeatherCondition {
    /// Derive a condition from the PTY and SKY codes.
    ///
    /// Any precipitation type wins over the sky state.
    pub fn from_codes(pty: &str, sky: &str) -> Self {
        match pty.trim() {
            // rain, rain/snow, shower, raindrops
            "1" | "2" | "4" | "5" => return WeatherCondition::Rain,
            // snow, raindrops/snow flurries, snow flurries
            "3" | "6" | "7" => return WeatherCondition::Snow,
            _ => {}
        }

        match sky.trim() {
            "3" | "4" => WeatherCondition::Clouds,
            _ => WeatherCondition::Clear,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherCondition::Clear => "clear",
            WeatherCondition::Clouds => "clouds",
            WeatherCondition::Rain => "rain",
            WeatherCondition::Storm => "storm",
            WeatherCondition::Snow => "snow",
            WeatherCondition::Mist => "mist",
        }
    }

    /// Korean display label.
    pub fn label(&self) -> &'static str {
        match self {
            WeatherCondition::Clear => "맑음",
            WeatherCondition::Clouds => "구름 많음",
            WeatherCondition::Rain => "비",
            WeatherCondition::Storm => "폭풍",
            WeatherCondition::Snow => "눈",
            WeatherCondition::Mist => "안개",
        }
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Conditions at the forecast instant closest to now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub temperature: i32,
    pub temp_min: i32,
    pub temp_max: i32,
    pub humidity: i32,
    pub wind_speed: f64,
    pub precipitation_probability: i32,
    pub condition: WeatherCondition,
    pub description: String,
}

/// A fully populated forecast instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecast {
    /// Display label, e.g. `14시`.
    pub label: String,
    pub temperature: i32,
    pub condition: WeatherCondition,
    pub precipitation_probability: i32,
    /// Millimetres, 0 when none is reported.
    pub precipitation: f64,
    /// Centimetres, 0 when none is reported.
    pub snow: f64,
    pub humidity: i32,
    pub wind_speed: f64,
    pub wind_direction: i32,
    pub is_today: bool,
    /// `YYYYMMDD`.
    pub forecast_date: String,
    pub forecast_hour: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub current: CurrentWeather,
    pub hourly: Vec<HourlyForecast>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precipitation_overrides_sky() {
        assert_eq!(WeatherCondition::from_codes("1", "1"), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_codes("4", "1"), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_codes("3", "1"), WeatherCondition::Snow);
        assert_eq!(WeatherCondition::from_codes("7", "4"), WeatherCondition::Snow);
    }

    #[test]
    fn sky_state_without_precipitation() {
        assert_eq!(WeatherCondition::from_codes("0", "1"), WeatherCondition::Clear);
        assert_eq!(WeatherCondition::from_codes("0", "3"), WeatherCondition::Clouds);
        assert_eq!(WeatherCondition::from_codes("0", "4"), WeatherCondition::Clouds);
        assert_eq!(WeatherCondition::from_codes("0", "9"), WeatherCondition::Clear);
    }

    #[test]
    fn category_codes_roundtrip() {
        for code in ["TMP", "TMN", "TMX", "SKY", "PTY", "POP", "PCP", "SNO", "REH", "WSD", "VEC", "T1H", "RN1"] {
            assert_eq!(Category::from(code).code(), code);
        }
        assert_eq!(Category::from("UUU"), Category::Other("UUU".into()));
    }

    #[test]
    fn decodes_wire_item() {
        let item: RawFeedItem = serde_json::from_value(serde_json::json!({
            "baseDate": "20240315",
            "baseTime": "1400",
            "category": "PCP",
            "fcstDate": "20240315",
            "fcstTime": "1500",
            "fcstValue": "강수없음",
            "nx": 60,
            "ny": 127
        }))
        .unwrap();

        assert_eq!(item.category(), Category::Pcp);
        assert_eq!(item.forecast_time, "1500");
        assert_eq!(item.value, "강수없음");
        assert!(item.belongs_to(GridCell { x: 60, y: 127 }));
        assert!(!item.belongs_to(GridCell { x: 61, y: 127 }));
    }

    #[test]
    fn item_without_grid_belongs_anywhere() {
        let item: RawFeedItem = serde_json::from_value(serde_json::json!({
            "baseDate": "20240315",
            "baseTime": "1400",
            "category": "TMP",
            "fcstDate": "20240315",
            "fcstTime": "1500",
            "fcstValue": "12"
        }))
        .unwrap();

        assert_eq!(item.nx, None);
        assert!(item.belongs_to(GridCell { x: 1, y: 1 }));
    }

    #[test]
    fn condition_serializes_lowercase() {
        let json = serde_json::to_string(&WeatherCondition::Clouds).unwrap();
        assert_eq!(json, "\"clouds\"");
    }
}
