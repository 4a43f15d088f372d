//! Capture fields shown on the overlay.
//!
//! Callers supply whichever fields they know. Anything left blank is filled
//! from the [`Clock`], the configured [`TextDefaults`] or the [`CodeSource`].
//!
//! # Example
//!
//! ```ignore
//! use proofstamp::watermark::fields::{CaptureFields, FixedClock};
//! use proofstamp::watermark::security::SeededCodes;
//!
//! let mut fields = CaptureFields::new();
//! fields.set_location("北京市朝阳区");
//!
//! let resolved = fields.resolve(&FixedClock::ymd_hm(2024, 5, 1, 14, 5), &mut SeededCodes::new(7), &defaults, 12);
//! assert_eq!(resolved.time, "14:05");
//! ```

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde::Serialize;

use super::config::TextDefaults;
use super::security::CodeSource;

const TIME_FORMAT: &str = "%H:%M";
const DATE_FORMAT: &str = "%Y年%m月%d日";

/// Source of the current local time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Build from calendar parts, falling back to the Unix epoch for an invalid date.
    pub fn ymd_hm(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        let at = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .unwrap_or_default();
        Self(at)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Chinese weekday name, e.g. `星期三`.
pub fn chinese_weekday(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "星期一",
        Weekday::Tue => "星期二",
        Weekday::Wed => "星期三",
        Weekday::Thu => "星期四",
        Weekday::Fri => "星期五",
        Weekday::Sat => "星期六",
        Weekday::Sun => "星期日",
    }
}

/// Optional overlay fields as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureFields {
    time: Option<String>,
    date: Option<String>,
    weekday: Option<String>,
    location: Option<String>,
    temperature: Option<String>,
    weather: Option<String>,
    category_label: Option<String>,
    group_label: Option<String>,
    security_code: Option<String>,
}

impl CaptureFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_time(&mut self, time: impl Into<String>) {
        self.time = Some(time.into());
    }

    pub fn set_date(&mut self, date: impl Into<String>) {
        self.date = Some(date.into());
    }

    pub fn set_weekday(&mut self, weekday: impl Into<String>) {
        self.weekday = Some(weekday.into());
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        self.location = Some(location.into());
    }

    pub fn set_temperature(&mut self, temperature: impl Into<String>) {
        self.temperature = Some(temperature.into());
    }

    pub fn set_weather(&mut self, weather: impl Into<String>) {
        self.weather = Some(weather.into());
    }

    /// Label on the ribbon (card theme) or the left of the header (banner theme).
    pub fn set_category_label(&mut self, label: impl Into<String>) {
        self.category_label = Some(label.into());
    }

    /// Title next to the category label.
    pub fn set_group_label(&mut self, label: impl Into<String>) {
        self.group_label = Some(label.into());
    }

    /// Use a fixed security code instead of generating one.
    pub fn set_security_code(&mut self, code: impl Into<String>) {
        self.security_code = Some(code.into());
    }

    /// Fill every blank field.
    pub fn resolve(
        &self,
        clock: &dyn Clock,
        codes: &mut dyn CodeSource,
        defaults: &TextDefaults,
        code_length: usize,
    ) -> ResolvedFields {
        let now = clock.now();

        ResolvedFields {
            time: non_blank(&self.time).unwrap_or_else(|| now.format(TIME_FORMAT).to_string()),
            date: non_blank(&self.date).unwrap_or_else(|| now.format(DATE_FORMAT).to_string()),
            weekday: non_blank(&self.weekday)
                .unwrap_or_else(|| chinese_weekday(now.weekday()).to_string()),
            location: non_blank(&self.location)
                .unwrap_or_else(|| defaults.default_location.clone()),
            temperature: non_blank(&self.temperature).unwrap_or_default(),
            weather: non_blank(&self.weather).unwrap_or_default(),
            category_label: non_blank(&self.category_label)
                .unwrap_or_else(|| defaults.default_category.clone()),
            group_label: non_blank(&self.group_label)
                .unwrap_or_else(|| defaults.default_group.clone()),
            security_code: non_blank(&self.security_code)
                .unwrap_or_else(|| codes.next_code(code_length)),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Overlay fields with every blank filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFields {
    pub time: String,
    pub date: String,
    pub weekday: String,
    pub location: String,
    pub temperature: String,
    pub weather: String,
    pub category_label: String,
    pub group_label: String,
    pub security_code: String,
}

impl ResolvedFields {
    /// `weekday weather temperature`, skipping empty parts.
    pub fn conditions_line(&self) -> String {
        [&self.weekday, &self.weather, &self.temperature]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watermark::security::SeededCodes;

    fn resolve(fields: &CaptureFields) -> ResolvedFields {
        let clock = FixedClock::ymd_hm(2024, 5, 1, 14, 5);
        fields.resolve(&clock, &mut SeededCodes::new(1), &TextDefaults::default(), 12)
    }

    #[test]
    fn test_blank_fields_fall_back_to_clock_and_defaults() {
        let resolved = resolve(&CaptureFields::new());
        assert_eq!(resolved.time, "14:05");
        assert_eq!(resolved.date, "2024年05月01日");
        assert_eq!(resolved.weekday, "星期三");
        assert_eq!(resolved.location, "未知地点");
        assert_eq!(resolved.category_label, "执勤巡逻");
        assert_eq!(resolved.group_label, "工作记录");
        assert_eq!(resolved.security_code.len(), 12);
        assert!(resolved.temperature.is_empty());
    }

    #[test]
    fn test_supplied_fields_are_trimmed() {
        let mut fields = CaptureFields::new();
        fields.set_location("  北京市朝阳区 ");
        fields.set_time("09:30");
        fields.set_security_code("P9ABCD");
        fields.set_group_label("   ");

        let resolved = resolve(&fields);
        assert_eq!(resolved.location, "北京市朝阳区");
        assert_eq!(resolved.time, "09:30");
        assert_eq!(resolved.security_code, "P9ABCD");
        assert_eq!(resolved.group_label, "工作记录");
    }

    #[test]
    fn test_conditions_line_skips_empty_parts() {
        let mut fields = CaptureFields::new();
        fields.set_temperature("26℃");
        let resolved = resolve(&fields);
        assert_eq!(resolved.conditions_line(), "星期三 26℃");

        fields.set_weather("晴");
        assert_eq!(resolve(&fields).conditions_line(), "星期三 晴 26℃");
    }

    #[test]
    fn test_chinese_weekday_names() {
        assert_eq!(chinese_weekday(Weekday::Mon), "星期一");
        assert_eq!(chinese_weekday(Weekday::Sun), "星期日");
    }

    #[test]
    fn test_fixed_clock_invalid_date_defaults_to_epoch() {
        let clock = FixedClock::ymd_hm(2024, 2, 30, 0, 0);
        assert_eq!(clock.now(), NaiveDateTime::default());
    }
}
