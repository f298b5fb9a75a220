//! Calendar bucketing: day, week and month periods used as cohort and
//! activity grouping keys.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Week,
    Month,
}

/// First day of a calendar week.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

impl WeekStart {
    /// Start of the week containing `date`.
    pub fn start_of_week(self, date: NaiveDate) -> NaiveDate {
        let offset = match self {
            WeekStart::Monday => date.weekday().num_days_from_monday(),
            WeekStart::Sunday => date.weekday().num_days_from_sunday(),
        };
        date - Duration::days(i64::from(offset))
    }
}

/// A calendar bucket identified by its granularity and first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    granularity: Granularity,
    start: NaiveDate,
}

impl Period {
    pub fn day(date: NaiveDate) -> Self {
        Self {
            granularity: Granularity::Day,
            start: date,
        }
    }

    pub fn week(date: NaiveDate, week_start: WeekStart) -> Self {
        Self {
            granularity: Granularity::Week,
            start: week_start.start_of_week(date),
        }
    }

    pub fn month(date: NaiveDate) -> Self {
        Self {
            granularity: Granularity::Month,
            start: date - Duration::days(i64::from(date.day0())),
        }
    }

    /// The period of the given granularity that contains `date`.
    pub fn containing(granularity: Granularity, date: NaiveDate, week_start: WeekStart) -> Self {
        match granularity {
            Granularity::Day => Self::day(date),
            Granularity::Week => Self::week(date, week_start),
            Granularity::Month => Self::month(date),
        }
    }

    pub fn of_timestamp(granularity: Granularity, ts: NaiveDateTime, week_start: WeekStart) -> Self {
        Self::containing(granularity, ts.date(), week_start)
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// First day of the following period.
    pub fn next_start(&self) -> NaiveDate {
        match self.granularity {
            Granularity::Day => self.start + Duration::days(1),
            Granularity::Week => self.start + Duration::days(7),
            Granularity::Month => self
                .start
                .checked_add_months(Months::new(1))
                .unwrap_or(NaiveDate::MAX),
        }
    }

    /// Last calendar day inside the period.
    pub fn last_day(&self) -> NaiveDate {
        self.next_start() - Duration::days(1)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.next_start()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.granularity {
            Granularity::Month => write!(f, "{}", self.start.format("%Y-%m")),
            Granularity::Day | Granularity::Week => write!(f, "{}", self.start.format("%Y-%m-%d")),
        }
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
