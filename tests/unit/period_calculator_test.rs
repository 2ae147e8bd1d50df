// Calendar alignment and contiguity of monitoring periods

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc, Weekday};
use proptest::prelude::*;

use scorewatch::modules::monitoring::models::MonitoringInterval;
use scorewatch::modules::monitoring::services::MonitoringPeriodCalculator;

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

#[test]
fn test_weekly_period_starts_on_sunday() {
    // 2026-03-11 is a Wednesday
    let bounds = MonitoringPeriodCalculator::bounds(MonitoringInterval::Weekly, utc(2026, 3, 11, 15, 30));

    assert_eq!(bounds.start, utc(2026, 3, 8, 0, 0));
    assert_eq!(bounds.start.weekday(), Weekday::Sun);
    assert_eq!(bounds.end, utc(2026, 3, 15, 0, 0) - Duration::milliseconds(1));
}

#[test]
fn test_quarter_and_year_boundaries() {
    let quarter = MonitoringPeriodCalculator::bounds(MonitoringInterval::Quarterly, utc(2026, 8, 20, 9, 0));
    assert_eq!(quarter.start, utc(2026, 7, 1, 0, 0));
    assert_eq!(quarter.end, utc(2026, 10, 1, 0, 0) - Duration::milliseconds(1));

    let year = MonitoringPeriodCalculator::bounds(MonitoringInterval::Yearly, utc(2026, 12, 31, 23, 59));
    assert_eq!(year.start, utc(2026, 1, 1, 0, 0));
    assert_eq!(year.end, utc(2027, 1, 1, 0, 0) - Duration::milliseconds(1));
}

#[test]
fn test_previous_month_handles_short_february() {
    let march = MonitoringPeriodCalculator::bounds(MonitoringInterval::Monthly, utc(2028, 3, 31, 12, 0));
    let february = MonitoringPeriodCalculator::previous_bounds(MonitoringInterval::Monthly, march.start);

    assert_eq!(february.start, utc(2028, 2, 1, 0, 0));
    assert_eq!(february.end, utc(2028, 3, 1, 0, 0) - Duration::milliseconds(1));
}

#[test]
fn test_previous_day_across_year_end() {
    let new_year = MonitoringPeriodCalculator::bounds(MonitoringInterval::Daily, utc(2027, 1, 1, 6, 0));
    let eve = MonitoringPeriodCalculator::previous_bounds(MonitoringInterval::Daily, new_year.start);

    assert_eq!(eve.start, utc(2026, 12, 31, 0, 0));
}

fn any_interval() -> impl Strategy<Value = MonitoringInterval> {
    prop::sample::select(MonitoringInterval::ALL.to_vec())
}

proptest! {
    /// Property: the period containing an instant really contains it
    #[test]
    fn test_bounds_contain_reference(
        interval in any_interval(),
        secs in 946_684_800i64..4_102_444_800i64,
    ) {
        let reference = Utc.timestamp_opt(secs, 0).unwrap();
        let bounds = MonitoringPeriodCalculator::bounds(interval, reference);

        prop_assert!(bounds.start <= reference && reference <= bounds.end);
    }

    /// Property: previous period ends exactly 1ms before the current one starts
    #[test]
    fn test_periods_are_contiguous(
        interval in any_interval(),
        secs in 946_684_800i64..4_102_444_800i64,
    ) {
        let reference = Utc.timestamp_opt(secs, 0).unwrap();
        let current = MonitoringPeriodCalculator::bounds(interval, reference);
        let previous = MonitoringPeriodCalculator::previous_bounds(interval, current.start);

        prop_assert_eq!(previous.end + Duration::milliseconds(1), current.start);
        prop_assert_eq!(
            MonitoringPeriodCalculator::bounds(interval, previous.start),
            previous
        );
    }
}
