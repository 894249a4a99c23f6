//! Julian day and time-of-day conversions for the wire date types.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// First day of the Gregorian calendar (1582-10-15).
pub const GREGORIAN_START: u32 = 2_299_161;
/// Julian day of 1970-01-01.
pub const UNIX_EPOCH_JULIAN_DAY: u32 = 2_440_588;
pub const MSECS_PER_DAY: u32 = 86_400_000;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Calendar date. Years before 1 AD are negative, there is no year 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CalendarDate {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}

impl CalendarDate {
    pub fn new(year: i32, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    fn days_in_month(&self) -> u8 {
        match self.month {
            4 | 6 | 9 | 11 => 30,
            2 if self.is_leap_year() => 29,
            2 => 28,
            _ => 31,
        }
    }

    fn is_leap_year(&self) -> bool {
        let year = if self.year < 0 { self.year + 1 } else { self.year };
        if *self < CalendarDate::new(1582, 10, 15) {
            year % 4 == 0
        } else {
            (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
        }
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Time of day with millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millis: u16,
}

impl TimeOfDay {
    /// `None` for values past the end of the day.
    pub fn from_msecs(msecs: u32) -> Option<Self> {
        if msecs >= MSECS_PER_DAY {
            return None;
        }
        Some(Self {
            hour: (msecs / 3_600_000) as u8,
            minute: (msecs / 60_000 % 60) as u8,
            second: (msecs / 1000 % 60) as u8,
            millis: (msecs % 1000) as u16,
        })
    }

    pub fn to_msecs(self) -> u32 {
        ((u32::from(self.hour) * 60 + u32::from(self.minute)) * 60 + u32::from(self.second))
            * 1000
            + u32::from(self.millis)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}.{:03}",
            self.hour, self.minute, self.second, self.millis
        )
    }
}

/// Calendar date for a Julian day number; `None` before year 1.
pub fn julian_day_to_date(julian_day: u32) -> Option<CalendarDate> {
    let (year, month, day) = if julian_day >= GREGORIAN_START {
        // Fliegel and Van Flandern.
        let mut ell = i64::from(julian_day) + 68_569;
        let n = (4 * ell) / 146_097;
        ell -= (146_097 * n + 3) / 4;
        let i = (4000 * (ell + 1)) / 1_461_001;
        ell = ell - (1461 * i) / 4 + 31;
        let j = (80 * ell) / 2447;
        let d = ell - (2447 * j) / 80;
        ell = j / 11;
        let m = j + 2 - 12 * ell;
        let y = 100 * (n - 49) + i + ell;
        (y, m, d)
    } else {
        // Julian calendar, Tøndering.
        let jd = i64::from(julian_day) + 32_082;
        let dd = (4 * jd + 3) / 1461;
        let ee = jd - (1461 * dd) / 4;
        let mm = (5 * ee + 2) / 153;
        let d = ee - (153 * mm + 2) / 5 + 1;
        let m = mm + 3 - 12 * (mm / 10);
        let mut y = dd - 4800 + mm / 10;
        if y <= 0 {
            y -= 1;
        }
        (y, m, d)
    };
    if year < 0 {
        return None;
    }
    Some(CalendarDate {
        year: i32::try_from(year).ok()?,
        month: month as u8,
        day: day as u8,
    })
}

/// Julian day number for a calendar date; `None` for impossible dates
/// (including the ten days dropped in October 1582) and for dates before
/// Julian day 0.
pub fn date_to_julian_day(date: CalendarDate) -> Option<u32> {
    if date.year == 0 || !(1..=12).contains(&date.month) {
        return None;
    }
    if date.day == 0 || date.day > date.days_in_month() {
        return None;
    }
    let gregorian = date >= CalendarDate::new(1582, 10, 15);
    if !gregorian && date > CalendarDate::new(1582, 10, 4) {
        return None;
    }

    let y = i64::from(if date.year < 0 { date.year + 1 } else { date.year });
    let m = i64::from(date.month);
    let d = i64::from(date.day);
    let jd = if gregorian {
        let k = (m - 14) / 12;
        (1461 * (y + 4800 + k)) / 4 + (367 * (m - 2 - 12 * k)) / 12
            - (3 * ((y + 4900 + k) / 100)) / 4
            + d
            - 32_075
    } else {
        let a = (14 - m) / 12;
        let yy = y + 4800 - a;
        let mm = m + 12 * a - 3;
        d + (153 * mm + 2) / 5 + 365 * yy + yy / 4 - 32_083
    };
    u32::try_from(jd).ok()
}

/// Split a duration since the UNIX epoch into Julian day and msecs of day (UTC).
pub fn julian_day_and_msecs(since_epoch: Duration) -> (u32, u32) {
    let millis = since_epoch.as_millis();
    let days = (millis / u128::from(MSECS_PER_DAY)) as u32;
    let msecs = (millis % u128::from(MSECS_PER_DAY)) as u32;
    (UNIX_EPOCH_JULIAN_DAY.saturating_add(days), msecs)
}

/// Time since the UNIX epoch; a clock set before 1970 reads as the epoch.
pub fn system_now() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

/// Wall clock used for `ClientDate`, heartbeat timestamps and the `DateTime`
/// null-date substitution.
pub trait Clock: Send + Sync {
    /// Time since the UNIX epoch.
    fn now(&self) -> Duration;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        system_now()
    }
}

/// A clock that never moves.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Duration);

impl Clock for FixedClock {
    fn now(&self) -> Duration {
        self.0
    }
}

/// Milliseconds since the UNIX epoch for a wire date and time, read as UTC.
pub fn epoch_millis(julian_day: u32, msecs: u32) -> i64 {
    (i64::from(julian_day) - i64::from(UNIX_EPOCH_JULIAN_DAY)) * i64::from(MSECS_PER_DAY)
        + i64::from(msecs)
}

/// Handshake `ClientDate` text, e.g. `Oct 16 2026 09:05:00`.
pub fn format_client_date(since_epoch: Duration) -> String {
    let (jd, msecs) = julian_day_and_msecs(since_epoch);
    let date = julian_day_to_date(jd).unwrap_or(CalendarDate::new(1970, 1, 1));
    let time = TimeOfDay::from_msecs(msecs).unwrap_or(TimeOfDay {
        hour: 0,
        minute: 0,
        second: 0,
        millis: 0,
    });
    let month = MONTH_ABBREVIATIONS[usize::from(date.month.saturating_sub(1)) % 12];
    format!(
        "{month} {:02} {} {:02}:{:02}:{:02}",
        date.day, date.year, time.hour, time.minute, time.second
    )
}
