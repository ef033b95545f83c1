// src/lifecycle/clock_window.rs
//! Clock-in time window.
//!
//! A worker may clock in from 30 minutes before the shift starts until the
//! shift end, inclusive on both sides, and only on the shift's date. Without
//! a shift there is nothing to gate and clocking in is always allowed.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::types::ShiftDetails;

pub const EARLY_CLOCK_IN_MINUTES: i64 = 30;

/// Source of "now". Local wall-clock time drives the window; UTC stamps
/// tentative records.
pub trait Clock: Send + Sync {
    fn now_local(&self) -> NaiveDateTime;
    fn now_utc(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_local(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockInWindow {
    /// No shift, or a shift without start/end times.
    Unrestricted,
    Open {
        closes_at: NaiveDateTime,
    },
    TooEarly {
        opens_at: NaiveDateTime,
    },
    Ended {
        ended_at: NaiveDateTime,
    },
    WrongDay {
        shift_date: NaiveDate,
    },
    InvalidSchedule(String),
}

impl ClockInWindow {
    pub fn is_eligible(&self) -> bool {
        matches!(self, ClockInWindow::Unrestricted | ClockInWindow::Open { .. })
    }

    /// Message shown when clocking in is blocked.
    pub fn explanation(&self) -> Option<String> {
        match self {
            ClockInWindow::Unrestricted | ClockInWindow::Open { .. } => None,
            ClockInWindow::TooEarly { opens_at } => Some(format!(
                "Too early to clock in. You can clock in from {} ({} minutes before your shift).",
                opens_at.format("%H:%M"),
                EARLY_CLOCK_IN_MINUTES
            )),
            ClockInWindow::Ended { ended_at } => Some(format!(
                "Your shift ended at {}.",
                ended_at.format("%H:%M")
            )),
            ClockInWindow::WrongDay { shift_date } => Some(format!(
                "Your shift is scheduled for {}, not today.",
                shift_date.format("%Y-%m-%d")
            )),
            ClockInWindow::InvalidSchedule(detail) => {
                Some(format!("Shift schedule could not be read: {}", detail))
            }
        }
    }
}

/// Parse `HH:MM` or `HH:MM:SS`.
pub fn parse_shift_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

pub fn evaluate(shift: Option<&ShiftDetails>, now: NaiveDateTime) -> ClockInWindow {
    let Some(shift) = shift else {
        return ClockInWindow::Unrestricted;
    };

    let today = now.date();
    if let Some(date) = shift.date {
        if date != today {
            return ClockInWindow::WrongDay { shift_date: date };
        }
    }

    let (Some(start), Some(end)) = (shift.start_time.as_deref(), shift.end_time.as_deref()) else {
        return ClockInWindow::Unrestricted;
    };

    let Some(start) = parse_shift_time(start) else {
        return ClockInWindow::InvalidSchedule(format!("start time '{}'", start));
    };
    let Some(end) = parse_shift_time(end) else {
        return ClockInWindow::InvalidSchedule(format!("end time '{}'", end));
    };

    let date = shift.date.unwrap_or(today);
    let shift_start = date.and_time(start);
    let shift_end = date.and_time(end);
    let early_window_start = shift_start - Duration::minutes(EARLY_CLOCK_IN_MINUTES);

    if now < early_window_start {
        ClockInWindow::TooEarly {
            opens_at: early_window_start,
        }
    } else if now > shift_end {
        ClockInWindow::Ended {
            ended_at: shift_end,
        }
    } else {
        ClockInWindow::Open {
            closes_at: shift_end,
        }
    }
}

pub fn is_clock_in_eligible(shift: Option<&ShiftDetails>, now: NaiveDateTime) -> bool {
    evaluate(shift, now).is_eligible()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, 0).unwrap()
    }

    fn shift(date: Option<NaiveDate>, start: &str, end: &str) -> ShiftDetails {
        ShiftDetails {
            date,
            start_time: Some(start.to_string()),
            end_time: Some(end.to_string()),
        }
    }

    #[test]
    fn test_window_boundaries_today() {
        let s = shift(Some(day()), "09:00", "17:00");
        assert!(is_clock_in_eligible(Some(&s), at(8, 31)));
        assert!(!is_clock_in_eligible(Some(&s), at(8, 29)));
        assert!(is_clock_in_eligible(Some(&s), at(8, 30)));
        assert!(is_clock_in_eligible(Some(&s), at(17, 0)));
        assert!(!is_clock_in_eligible(Some(&s), at(17, 1)));
    }

    #[test]
    fn test_other_day_never_eligible() {
        let tomorrow = day().succ_opt().unwrap();
        let s = shift(Some(tomorrow), "00:00", "23:59");
        for hour in 0..24 {
            assert!(!is_clock_in_eligible(Some(&s), at(hour, 0)));
        }
        assert_eq!(
            evaluate(Some(&s), at(12, 0)),
            ClockInWindow::WrongDay {
                shift_date: tomorrow
            }
        );
    }

    #[test]
    fn test_no_shift_always_eligible() {
        for hour in 0..24 {
            assert!(is_clock_in_eligible(None, at(hour, 17)));
        }
        assert_eq!(evaluate(None, at(3, 0)), ClockInWindow::Unrestricted);
    }

    #[test]
    fn test_undated_shift_uses_today() {
        let s = shift(None, "09:00:00", "17:00:00");
        assert!(is_clock_in_eligible(Some(&s), at(9, 15)));
        assert!(!is_clock_in_eligible(Some(&s), at(18, 0)));
    }

    #[test]
    fn test_explanations() {
        let s = shift(Some(day()), "09:00", "17:00");
        let early = evaluate(Some(&s), at(8, 0));
        assert_eq!(early, ClockInWindow::TooEarly { opens_at: at(8, 30) });
        assert!(early.explanation().unwrap().contains("08:30"));

        let late = evaluate(Some(&s), at(18, 0));
        assert!(late.explanation().unwrap().contains("17:00"));

        assert!(evaluate(Some(&s), at(12, 0)).explanation().is_none());
    }

    #[test]
    fn test_unreadable_times_block_clock_in() {
        let s = shift(Some(day()), "9am", "17:00");
        let window = evaluate(Some(&s), at(9, 0));
        assert!(!window.is_eligible());
        assert!(matches!(window, ClockInWindow::InvalidSchedule(_)));

        let partial = ShiftDetails {
            date: Some(day()),
            start_time: Some("09:00".to_string()),
            end_time: None,
        };
        assert!(is_clock_in_eligible(Some(&partial), at(3, 0)));
    }
}
