//! Time-range filtering of dated records.
//!
//! Calendar questions (which year, which day) are answered in a chosen time
//! zone through [`Calendar`]. The CLI uses the machine's local zone; tests
//! pin UTC and a fixed "now".

use std::fmt;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::parse::{self, Timestamp};

/// Year a custom range starts at when only the end is given.
pub const EPOCH_YEAR: i32 = 2000;

/// Time zone plus the current instant.
#[derive(Debug, Clone)]
pub struct Calendar<Tz: TimeZone> {
    tz: Tz,
    now: DateTime<Utc>,
}

impl Calendar<Local> {
    pub fn local() -> Self {
        Self {
            tz: Local,
            now: Utc::now(),
        }
    }
}

impl<Tz: TimeZone> Calendar<Tz> {
    pub fn new(tz: Tz, now: DateTime<Utc>) -> Self {
        Self { tz, now }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Wall-clock time of an instant in this calendar's zone.
    pub fn wall_time(&self, dt: &DateTime<Utc>) -> NaiveDateTime {
        dt.with_timezone(&self.tz).naive_local()
    }

    pub fn day_of(&self, dt: &DateTime<Utc>) -> NaiveDate {
        self.wall_time(dt).date()
    }

    pub fn year_of(&self, dt: &DateTime<Utc>) -> i32 {
        self.day_of(dt).year()
    }

    pub fn today(&self) -> NaiveDate {
        self.day_of(&self.now)
    }

    /// Instant of a record timestamp. Values with an offset are absolute;
    /// naive date-times and bare dates are wall-clock readings in this zone,
    /// so `"2023-02-01"` always falls on February 1st.
    pub fn instant_of(&self, raw: &str) -> Option<DateTime<Utc>> {
        match parse::parse_timestamp(raw)? {
            Timestamp::Absolute(dt) => Some(dt),
            Timestamp::Wall(naive) => self.resolve_wall(naive),
        }
    }

    fn resolve_wall(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        // A reading inside a DST gap does not exist; take the first valid
        // time after it.
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .or_else(|| self.tz.from_local_datetime(&(naive + chrono::Duration::hours(1))).earliest())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Which records feed the "filtered" statistics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TimeFilter {
    #[default]
    All,
    Year(i32),
    /// Inclusive day range. A missing start means 2000-01-01, a missing end
    /// means now; both missing means unrestricted.
    Custom {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

impl TimeFilter {
    /// Build a filter from a mode token: `"all"`, `"custom"`, or a year.
    /// Unrecognised tokens fall back to `All`.
    pub fn from_mode(mode: &str, start: Option<&str>, end: Option<&str>) -> Self {
        match mode.trim().to_lowercase().as_str() {
            "all" | "" => Self::All,
            "custom" => Self::Custom {
                start: start.and_then(parse::parse_day),
                end: end.and_then(parse::parse_day),
            },
            other => match other.parse::<i32>() {
                Ok(year) => Self::Year(year),
                Err(_) => {
                    log::warn!("Unknown time filter mode '{mode}', showing all time");
                    Self::All
                }
            },
        }
    }

    /// Whether a record with this date is in range. Undated records never are.
    pub fn contains<Tz: TimeZone>(&self, date: Option<&DateTime<Utc>>, cal: &Calendar<Tz>) -> bool {
        let Some(date) = date else {
            return false;
        };
        match self {
            Self::All => true,
            Self::Year(year) => cal.year_of(date) == *year,
            Self::Custom { start: None, end: None } => true,
            Self::Custom { start, end } => {
                let wall = cal.wall_time(date);
                let lower = start
                    .unwrap_or_else(|| NaiveDate::from_ymd_opt(EPOCH_YEAR, 1, 1).unwrap_or_default())
                    .and_hms_opt(0, 0, 0)
                    .unwrap_or_default();
                let upper = match end {
                    Some(day) => day.and_hms_milli_opt(23, 59, 59, 999).unwrap_or_default(),
                    None => cal.wall_time(&cal.now()),
                };
                wall >= lower && wall <= upper
            }
        }
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all time"),
            Self::Year(y) => write!(f, "{y}"),
            Self::Custom { start, end } => {
                let show = |d: &Option<NaiveDate>| {
                    d.map(|d| d.to_string()).unwrap_or_else(|| "…".to_string())
                };
                write!(f, "{} to {}", show(start), show(end))
            }
        }
    }
}
