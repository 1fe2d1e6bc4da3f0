//! Issue-time selection for the two feed cadences.
//!
//! Each release becomes available ten minutes after its nominal hour, so
//! asking for "the current hour" naively would request data that does not
//! exist yet. Every function here takes `now` explicitly; only [`kst_now`]
//! reads the clock.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use chrono_tz::Asia::Seoul;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Short-term forecast release hours, latest first.
pub const FORECAST_RELEASE_HOURS: [u32; 8] = [23, 20, 17, 14, 11, 8, 5, 2];

/// Minutes after the nominal hour before a release is served.
pub const AVAILABILITY_LAG_MINUTES: u32 = 10;

/// The (base_date, base_time) pair a feed request is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueTime {
    pub date: NaiveDate,
    pub hour: u32,
}

impl IssueTime {
    /// `YYYYMMDD`, as the feed expects in `base_date`.
    pub fn base_date(&self) -> String {
        format!("{:04}{:02}{:02}", self.date.year(), self.date.month(), self.date.day())
    }

    /// `HH00`, as the feed expects in `base_time`.
    pub fn base_time(&self) -> String {
        format!("{:02}00", self.hour)
    }
}

impl fmt::Display for IssueTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.base_date(), self.base_time())
    }
}

/// Publication cadences offered by the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cadence {
    /// Village forecast, eight releases a day.
    ShortTerm,
    /// Hourly nowcast observations.
    UltraShortTerm,
}

impl Cadence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cadence::ShortTerm => "short-term forecast",
            Cadence::UltraShortTerm => "ultra-short-term observation",
        }
    }

    pub fn select(&self, now: NaiveDateTime) -> IssueTime {
        match self {
            Cadence::ShortTerm => select_forecast_issue_time(now),
            Cadence::UltraShortTerm => select_observation_issue_time(now),
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest short-term forecast release already published at `now`.
///
/// Before 02:10 nothing from today is out yet, so the previous day's 23:00
/// release is used.
pub fn select_forecast_issue_time(now: NaiveDateTime) -> IssueTime {
    let hour = now.hour();
    let minute = now.minute();

    for release in FORECAST_RELEASE_HOURS {
        if hour > release || (hour == release && minute >= AVAILABILITY_LAG_MINUTES) {
            return IssueTime { date: now.date(), hour: release };
        }
    }

    IssueTime { date: previous_day(now.date()), hour: 23 }
}

/// Latest hourly observation already published at `now`.
pub fn select_observation_issue_time(now: NaiveDateTime) -> IssueTime {
    if now.minute() >= AVAILABILITY_LAG_MINUTES {
        return IssueTime { date: now.date(), hour: now.hour() };
    }

    match now.hour() {
        0 => IssueTime { date: previous_day(now.date()), hour: 23 },
        hour => IssueTime { date: now.date(), hour: hour - 1 },
    }
}

/// Current wall-clock time in the feed's zone (Asia/Seoul).
pub fn kst_now() -> NaiveDateTime {
    Utc::now().with_timezone(&Seoul).naive_local()
}

fn previous_day(date: NaiveDate) -> NaiveDate {
    date - Duration::days(1)
}
