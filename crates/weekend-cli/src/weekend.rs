use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekendDay {
    Saturday,
    Sunday,
}

impl WeekendDay {
    // Sunday counts as 7 so that "next Sunday" is never today.
    fn index_from_sunday(self) -> i64 {
        match self {
            Self::Saturday => 6,
            Self::Sunday => 7,
        }
    }
}

/// Days from a weekday (`0` = Sunday .. `6` = Saturday) to the next `day`,
/// always in `1..=7`.
pub fn days_until(day: WeekendDay, weekday_from_sunday: u32) -> i64 {
    let mut days = day.index_from_sunday() - i64::from(weekday_from_sunday);
    if days <= 0 {
        days += 7;
    }
    days
}

/// Calendar date of the next `day` as seen from `now`'s own time zone.
pub fn next_weekend_date<Z: TimeZone>(day: WeekendDay, now: &DateTime<Z>) -> NaiveDate {
    let today = now.date_naive();
    today + Duration::days(days_until(day, now.weekday().num_days_from_sunday()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekendDates {
    pub saturday: NaiveDate,
    pub sunday: NaiveDate,
}

impl WeekendDates {
    /// The upcoming Saturday and the Sunday right after it.
    ///
    /// On a Saturday the standalone Sunday rule would land on tomorrow, a
    /// different weekend than next Saturday; the pair stays anchored on
    /// Saturday instead.
    pub fn resolve<Z: TimeZone>(now: &DateTime<Z>) -> Self {
        let saturday = next_weekend_date(WeekendDay::Saturday, now);
        Self {
            saturday,
            sunday: saturday + Duration::days(1),
        }
    }
}

pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
