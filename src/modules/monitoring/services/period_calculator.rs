use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, Utc};

use crate::modules::monitoring::models::{MonitoringInterval, PeriodBounds};

/// Calendar-aligned period boundaries, computed in UTC
///
/// Every period is the inclusive window `[start 00:00:00.000, end 23:59:59.999]`.
/// Weeks start on Sunday, quarters in January, April, July and October.
pub struct MonitoringPeriodCalculator;

impl MonitoringPeriodCalculator {
    /// Bounds of the period of `interval` containing `reference`
    pub fn bounds(interval: MonitoringInterval, reference: DateTime<Utc>) -> PeriodBounds {
        let start = Self::aligned_start(interval, reference.date_naive());
        let next = Self::advance(interval, start);

        PeriodBounds {
            start: midnight(start),
            end: midnight(next) - Duration::milliseconds(1),
        }
    }

    /// Bounds of the period immediately preceding the one starting at `current_start`
    pub fn previous_bounds(interval: MonitoringInterval, current_start: DateTime<Utc>) -> PeriodBounds {
        let prior = Self::retreat(interval, current_start.date_naive());
        Self::bounds(interval, midnight(prior))
    }

    fn aligned_start(interval: MonitoringInterval, date: NaiveDate) -> NaiveDate {
        match interval {
            MonitoringInterval::Daily => date,
            MonitoringInterval::Weekly => {
                date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
            }
            MonitoringInterval::Monthly => first_of_month(date.year(), date.month()),
            MonitoringInterval::Quarterly => {
                let quarter_month = (date.month0() / 3) * 3 + 1;
                first_of_month(date.year(), quarter_month)
            }
            MonitoringInterval::Yearly => first_of_month(date.year(), 1),
        }
    }

    fn advance(interval: MonitoringInterval, start: NaiveDate) -> NaiveDate {
        match interval {
            MonitoringInterval::Daily => start + Duration::days(1),
            MonitoringInterval::Weekly => start + Duration::days(7),
            MonitoringInterval::Monthly => start + Months::new(1),
            MonitoringInterval::Quarterly => start + Months::new(3),
            MonitoringInterval::Yearly => start + Months::new(12),
        }
    }

    fn retreat(interval: MonitoringInterval, start: NaiveDate) -> NaiveDate {
        match interval {
            MonitoringInterval::Daily => start - Duration::days(1),
            MonitoringInterval::Weekly => start - Duration::days(7),
            MonitoringInterval::Monthly => start - Months::new(1),
            MonitoringInterval::Quarterly => start - Months::new(3),
            MonitoringInterval::Yearly => start - Months::new(12),
        }
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).expect("first day of a valid month")
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
