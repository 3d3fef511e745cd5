//! Wall-clock trigger predicates.
//!
//! # Invariants
//! - Triggers are pure predicates over a wall-clock minute; they hold no state.
//! - Seconds and sub-seconds are ignored when matching.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};

/// Predicate deciding whether a job is due at a given wall-clock time.
pub trait Trigger: Send {
    fn matches(&self, at: &NaiveDateTime) -> bool;

    /// Short human-readable schedule for logs.
    fn describe(&self) -> String;
}

/// Calendar match on minute, hour and optional date fields.
///
/// `None` fields match any value, like `*` in a cron expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarTrigger {
    pub minute: u32,
    pub hour: u32,
    pub day: Option<u32>,
    pub month: Option<u32>,
    pub weekday: Option<Weekday>,
}

impl CalendarTrigger {
    /// Fires every `weekday` at `hour:minute`.
    pub fn weekly(weekday: Weekday, hour: u32, minute: u32) -> Self {
        Self {
            minute,
            hour,
            day: None,
            month: None,
            weekday: Some(weekday),
        }
    }

    /// Fires every year on `month`/`day` (both 1-based) at `hour:minute`.
    pub fn yearly(month: u32, day: u32, hour: u32, minute: u32) -> Self {
        Self {
            minute,
            hour,
            day: Some(day),
            month: Some(month),
            weekday: None,
        }
    }
}

impl Trigger for CalendarTrigger {
    fn matches(&self, at: &NaiveDateTime) -> bool {
        at.minute() == self.minute
            && at.hour() == self.hour
            && self.day.map_or(true, |day| at.day() == day)
            && self.month.map_or(true, |month| at.month() == month)
            && self.weekday.map_or(true, |weekday| at.weekday() == weekday)
    }

    fn describe(&self) -> String {
        let field = |value: Option<u32>| value.map_or_else(|| "*".to_string(), |v| v.to_string());
        format!(
            "{} {} {} {} {}",
            self.minute,
            self.hour,
            field(self.day),
            field(self.month),
            field(self.weekday.map(|weekday| weekday.num_days_from_sunday()))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{CalendarTrigger, Trigger};
    use chrono::{NaiveDate, NaiveDateTime, Weekday};

    fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hh, mm, ss)
            .unwrap()
    }

    #[test]
    fn weekly_trigger_matches_monday_midnight_only() {
        let trigger = CalendarTrigger::weekly(Weekday::Mon, 0, 0);
        // 2024-03-04 was a Monday.
        assert!(trigger.matches(&at(2024, 3, 4, 0, 0, 0)));
        assert!(trigger.matches(&at(2024, 3, 4, 0, 0, 45)));
        assert!(!trigger.matches(&at(2024, 3, 4, 0, 1, 0)));
        assert!(!trigger.matches(&at(2024, 3, 5, 0, 0, 0)));
        assert_eq!(trigger.describe(), "0 0 * * 1");
    }

    #[test]
    fn yearly_trigger_matches_new_year_only() {
        let trigger = CalendarTrigger::yearly(1, 1, 0, 0);
        assert!(trigger.matches(&at(2025, 1, 1, 0, 0, 10)));
        assert!(!trigger.matches(&at(2025, 2, 1, 0, 0, 0)));
        assert!(!trigger.matches(&at(2025, 1, 2, 0, 0, 0)));
        assert_eq!(trigger.describe(), "0 0 1 1 *");
    }
}
