//! Minimal `xsd:dateTime`/`xsd:date`/`xsd:time` support: enough structure for
//! §4.3's `YEAR`/`MONTH`/.../`TIMEZONE`/`TZ` functions and §4.1's "dates by
//! instant" comparison rule. Not a general calendar library — no leap-second
//! arithmetic beyond what `NOW()` and comparison need.
use std::fmt;
use std::str::FromStr;

/// Offset from UTC in minutes, or "no timezone specified" (`xsd` allows a
/// dateTime/date/time to carry no timezone at all).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct TzOffset(pub Option<i32>);

impl TzOffset {
    pub const NONE: Self = Self(None);
    pub const UTC: Self = Self(Some(0));
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct DateTime {
    pub year: i64,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    /// Seconds scaled by 1000 to keep sub-second precision without a float.
    pub millisecond_of_minute: u32,
    pub tz: TzOffset,
}

impl DateTime {
    /// Instant in milliseconds since the proleptic-Gregorian epoch, after
    /// normalizing to UTC — used for §4.1's "dates by instant" ordering. A
    /// dateTime with no timezone is compared in its own local frame per
    /// XPath F&O's "indeterminate" handling; we approximate by treating it
    /// as UTC, which is sufficient for same-source comparisons.
    pub fn instant_millis(&self) -> i64 {
        let days = days_from_civil(self.year, self.month, self.day);
        let offset_minutes = self.tz.0.unwrap_or(0);
        let minute_of_day = i64::from(self.hour) * 60 + i64::from(self.minute) - i64::from(offset_minutes);
        days * 86_400_000 + minute_of_day * 60_000 + i64::from(self.millisecond_of_minute)
    }

    pub fn year(&self) -> i64 {
        self.year
    }
    pub fn month(&self) -> u8 {
        self.month
    }
    pub fn day(&self) -> u8 {
        self.day
    }
    pub fn hour(&self) -> u8 {
        self.hour
    }
    pub fn minute(&self) -> u8 {
        self.minute
    }
    pub fn second(&self) -> f64 {
        f64::from(self.millisecond_of_minute) / 1000.0
    }
    pub fn timezone_minutes(&self) -> Option<i32> {
        self.tz.0
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:06.3}",
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second()
        )?;
        write_tz(f, self.tz)
    }
}

impl FromStr for DateTime {
    type Err = TemporalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (date_str, rest) = s.split_once('T').ok_or(TemporalParseError)?;
        let (year, month, day) = parse_date_parts(date_str)?;
        let (time_str, tz) = split_timezone(rest);
        let (hour, minute, millisecond_of_minute) = parse_time_parts(time_str)?;
        Ok(Self {
            year,
            month,
            day,
            hour,
            minute,
            millisecond_of_minute,
            tz,
        })
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Date {
    pub year: i64,
    pub month: u8,
    pub day: u8,
    pub tz: TzOffset,
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)?;
        write_tz(f, self.tz)
    }
}

impl FromStr for Date {
    type Err = TemporalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (date_part, tz_part) = split_timezone(s);
        let (year, month, day) = parse_date_parts(date_part)?;
        Ok(Self { year, month, day, tz: tz_part })
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub millisecond_of_minute: u32,
    pub tz: TzOffset,
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:06.3}",
            self.hour,
            self.minute,
            f64::from(self.millisecond_of_minute) / 1000.0
        )?;
        write_tz(f, self.tz)
    }
}

impl FromStr for Time {
    type Err = TemporalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (time_part, tz_part) = split_timezone(s);
        let (hour, minute, millisecond_of_minute) = parse_time_parts(time_part)?;
        Ok(Self {
            hour,
            minute,
            millisecond_of_minute,
            tz: tz_part,
        })
    }
}

fn write_tz(f: &mut fmt::Formatter<'_>, tz: TzOffset) -> fmt::Result {
    match tz.0 {
        None => Ok(()),
        Some(0) => write!(f, "Z"),
        Some(minutes) => {
            let sign = if minutes < 0 { '-' } else { '+' };
            let minutes = minutes.abs();
            write!(f, "{sign}{:02}:{:02}", minutes / 60, minutes % 60)
        }
    }
}

fn split_timezone(s: &str) -> (&str, TzOffset) {
    if let Some(rest) = s.strip_suffix('Z') {
        return (rest, TzOffset::UTC);
    }
    // A leading '-' or '+' inside the last 6 chars marks an explicit offset;
    // a leading '-' at position 0 is the (already-consumed) date sign.
    if s.len() > 6 {
        let tail = &s[s.len() - 6..];
        if (tail.starts_with('+') || tail.starts_with('-')) && tail.as_bytes()[3] == b':' {
            let sign = if tail.starts_with('-') { -1 } else { 1 };
            let hours: i32 = tail[1..3].parse().unwrap_or(0);
            let minutes: i32 = tail[4..6].parse().unwrap_or(0);
            return (&s[..s.len() - 6], TzOffset(Some(sign * (hours * 60 + minutes))));
        }
    }
    (s, TzOffset::NONE)
}

fn parse_date_parts(s: &str) -> Result<(i64, u8, u8), TemporalParseError> {
    let mut parts = s.splitn(3, '-').collect::<Vec<_>>();
    // Negative years serialize as a leading '-', which `splitn` would treat
    // as an empty first segment; re-glue it onto the year if so.
    if parts.first() == Some(&"") {
        if parts.len() < 4 {
            return Err(TemporalParseError);
        }
        let year = format!("-{}", parts.remove(1));
        parts[0] = Box::leak(year.into_boxed_str());
    }
    let [year, month, day] = parts.try_into().map_err(|_| TemporalParseError)?;
    Ok((
        year.parse().map_err(|_| TemporalParseError)?,
        month.parse().map_err(|_| TemporalParseError)?,
        day.parse().map_err(|_| TemporalParseError)?,
    ))
}

fn parse_time_parts(s: &str) -> Result<(u8, u8, u32), TemporalParseError> {
    let mut parts = s.splitn(3, ':');
    let hour: u8 = parts.next().ok_or(TemporalParseError)?.parse().map_err(|_| TemporalParseError)?;
    let minute: u8 = parts.next().ok_or(TemporalParseError)?.parse().map_err(|_| TemporalParseError)?;
    let seconds: f64 = parts.next().ok_or(TemporalParseError)?.parse().map_err(|_| TemporalParseError)?;
    Ok((hour, minute, (seconds * 1000.0).round() as u32))
}

/// Days since 1970-01-01 for a proleptic Gregorian date (Howard Hinnant's
/// `days_from_civil` algorithm).
fn days_from_civil(y: i64, m: u8, d: u8) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as i64;
    let mp = (i64::from(m) + 9) % 12;
    let doy = (153 * mp + 2) / 5 + i64::from(d) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TemporalParseError;

impl fmt::Display for TemporalParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid xsd date/time lexical form")
    }
}

impl std::error::Error for TemporalParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_utc_datetime() {
        let dt: DateTime = "2024-03-05T10:15:30.500Z".parse().unwrap();
        assert_eq!(dt.year, 2024);
        assert_eq!(dt.hour, 10);
        assert_eq!(dt.to_string(), "2024-03-05T10:15:30.500Z");
    }

    #[test]
    fn instant_accounts_for_offset() {
        let a: DateTime = "2024-01-01T12:00:00Z".parse().unwrap();
        let b: DateTime = "2024-01-01T13:00:00+01:00".parse().unwrap();
        assert_eq!(a.instant_millis(), b.instant_millis());
    }

    #[test]
    fn date_round_trips() {
        let d: Date = "1999-01-01".parse().unwrap();
        assert_eq!(d.to_string(), "1999-01-01");
    }
}
