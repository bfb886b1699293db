//! Due-date inference for extracted action items.
//!
//! Explicit dates win over relative expressions. Every function takes `today`
//! explicitly so results are reproducible.

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use regex::Regex;
use std::sync::LazyLock;

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})[-/](\d{1,2})[-/](\d{1,2})").expect("iso date pattern is valid")
});

static DMY_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})-(\d{1,2})-(\d{4})\b").expect("dmy date pattern is valid")
});

static JA_FULL_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})年\s*(\d{1,2})月\s*(\d{1,2})日").expect("japanese date pattern is valid")
});

static JA_MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})月\s*(\d{1,2})日").expect("month/day pattern is valid")
});

static DAYS_LATER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*日後").expect("days-later pattern is valid"));

static WEEKS_LATER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*週間後").expect("weeks-later pattern is valid"));

/// Infer a due date from free text relative to `today`
///
/// Recognises `YYYY-MM-DD`, `DD-MM-YYYY`, `YYYY年M月D日` and `M月D日`
/// (prefixes such as 締切/期限/by/due/until and the suffix まで are allowed
/// around them), plus the relative forms 明日/tomorrow, 今週/this week,
/// 来週/next week, 今月/this month, 来月/next month, `N日後` and `N週間後`.
pub fn extract_due_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    explicit_date(text, today).or_else(|| relative_date(text, today))
}

fn explicit_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(date) = ISO_DATE
        .captures_iter(text)
        .find_map(|caps| ymd(&caps[1], &caps[2], &caps[3]))
    {
        return Some(date);
    }

    if let Some(date) = DMY_DATE
        .captures_iter(text)
        .find_map(|caps| ymd(&caps[3], &caps[2], &caps[1]))
    {
        return Some(date);
    }

    if let Some(date) = JA_FULL_DATE
        .captures_iter(text)
        .find_map(|caps| ymd(&caps[1], &caps[2], &caps[3]))
    {
        return Some(date);
    }

    JA_MONTH_DAY.captures_iter(text).find_map(|caps| {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
        if this_year < today {
            NaiveDate::from_ymd_opt(today.year() + 1, month, day)
        } else {
            Some(this_year)
        }
    })
}

fn relative_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let lowered = text.to_lowercase();

    if let Some(caps) = WEEKS_LATER.captures(text) {
        let weeks: u64 = caps[1].parse().ok()?;
        return today.checked_add_days(Days::new(weeks.checked_mul(7)?));
    }
    if let Some(caps) = DAYS_LATER.captures(text) {
        let days: u64 = caps[1].parse().ok()?;
        return today.checked_add_days(Days::new(days));
    }
    if text.contains("明日") || lowered.contains("tomorrow") {
        return today.checked_add_days(Days::new(1));
    }
    if text.contains("来週") || lowered.contains("next week") {
        return upcoming_friday(today).checked_add_days(Days::new(7));
    }
    if text.contains("今週") || lowered.contains("this week") {
        return Some(upcoming_friday(today));
    }
    if text.contains("来月") || lowered.contains("next month") {
        return end_of_month(today.checked_add_months(Months::new(1))?);
    }
    if text.contains("今月") || lowered.contains("this month") {
        return end_of_month(today);
    }

    None
}

/// The next Friday strictly after `today` when today is Friday, otherwise this week's
fn upcoming_friday(today: NaiveDate) -> NaiveDate {
    let current = today.weekday().num_days_from_monday();
    let friday = Weekday::Fri.num_days_from_monday();
    let mut ahead = (friday + 7 - current) % 7;
    if ahead == 0 {
        ahead = 7;
    }
    today + Days::new(u64::from(ahead))
}

fn end_of_month(date: NaiveDate) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?;
    first.checked_add_months(Months::new(1))?.pred_opt()
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}
