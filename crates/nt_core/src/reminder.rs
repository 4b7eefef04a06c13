//! Reminder time-expression grammar (§4.9, §6): evaluates a `#reminder-<expr>`
//! tag against a reference time and returns the next occurrence strictly
//! after it. The evaluator is pure: `(expr, now) -> next_timestamp`.

use chrono::{Datelike, NaiveDate, Weekday};

/// A parsed reminder time expression.
#[derive(Clone, Debug, PartialEq)]
pub enum TimeExpr {
    /// A concrete calendar date, e.g. `2025-09-01`.
    Concrete(NaiveDate),
    /// `every-<pattern>`: recurring, evaluated to the next occurrence after `now`.
    Every(Pattern),
}

/// The field pattern inside a (possibly recurring) time expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Pattern {
    Weekday(Weekday),
    Templated {
        year: YearField,
        month: MonthField,
        day: Option<u32>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum YearField {
    Any,
    Even,
    Odd,
    Fixed(i32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MonthField {
    Any,
    Even,
    Odd,
    Fixed(u32),
}

/// Parses the `<expr>` portion of a `#reminder-<expr>` tag.
pub fn parse(expr: &str) -> Option<TimeExpr> {
    let expr = expr.trim();
    if let Some(rest) = expr.strip_prefix("every-") {
        return parse_pattern(rest).map(TimeExpr::Every);
    }
    if let Ok(date) = NaiveDate::parse_from_str(expr, "%Y-%m-%d") {
        return Some(TimeExpr::Concrete(date));
    }
    None
}

fn parse_pattern(rest: &str) -> Option<Pattern> {
    if let Some(weekday) = parse_weekday_token(rest.trim_matches(|c| c == '$' || c == '{' || c == '}')) {
        return Some(Pattern::Weekday(weekday));
    }

    // Templated `${year}-${month}-${day}`-shaped expressions, with each field
    // optionally a concrete number instead of a `${...}` template. Fields are
    // split on `-`, but a `${...}` group (e.g. `${odd-year}`) carries its own
    // internal `-` and must stay intact.
    let parts = tokenize_fields(rest);
    if parts.len() < 2 {
        return None;
    }

    let year = parse_year_field(&parts[0])?;
    let month = parse_month_field(&parts[1])?;
    let day = parts.get(2).and_then(|p| strip_template(p).parse::<u32>().ok());

    Some(Pattern::Templated { year, month, day })
}

/// Splits a field expression on `-`, treating any `${...}` group as a single
/// atomic token even though its contents (`even-year`, `odd-month`, …) use
/// `-` themselves.
fn tokenize_fields(s: &str) -> Vec<String> {
    let mut protected = String::with_capacity(s.len());
    let mut in_template = false;
    let mut prev = '\0';
    for ch in s.chars() {
        if ch == '{' && prev == '$' {
            in_template = true;
            protected.push(ch);
        } else if ch == '}' {
            in_template = false;
            protected.push(ch);
        } else if ch == '-' && in_template {
            protected.push('\u{0}');
        } else {
            protected.push(ch);
        }
        prev = ch;
    }
    protected
        .split('-')
        .map(|p| p.replace('\u{0}', "-"))
        .collect()
}

fn strip_template(s: &str) -> String {
    s.trim()
        .trim_start_matches("${")
        .trim_end_matches('}')
        .to_string()
}

fn parse_year_field(s: &str) -> Option<YearField> {
    let inner = strip_template(s);
    match inner.as_str() {
        "year" => Some(YearField::Any),
        "even-year" => Some(YearField::Even),
        "odd-year" => Some(YearField::Odd),
        other => other.parse::<i32>().ok().map(YearField::Fixed),
    }
}

fn parse_month_field(s: &str) -> Option<MonthField> {
    let inner = strip_template(s);
    match inner.as_str() {
        "month" => Some(MonthField::Any),
        "even-month" => Some(MonthField::Even),
        "odd-month" => Some(MonthField::Odd),
        other => other.parse::<u32>().ok().map(MonthField::Fixed),
    }
}

fn parse_weekday_token(s: &str) -> Option<Weekday> {
    match s.to_ascii_lowercase().as_str() {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Returns the next occurrence of `expr` strictly after `now`, as a Unix
/// timestamp at midnight UTC on the matching date.
pub fn next_occurrence(expr: &TimeExpr, now: NaiveDate) -> Option<NaiveDate> {
    match expr {
        TimeExpr::Concrete(date) => {
            if *date > now {
                Some(*date)
            } else {
                None
            }
        }
        TimeExpr::Every(pattern) => next_matching(pattern, now),
    }
}

fn next_matching(pattern: &Pattern, now: NaiveDate) -> Option<NaiveDate> {
    let mut candidate = now.succ_opt()?;
    // Bound the search: the longest possible period is roughly two years
    // (odd/even year plus a specific day), so 800 days is ample headroom.
    for _ in 0..800 {
        if matches_pattern(pattern, candidate) {
            return Some(candidate);
        }
        candidate = candidate.succ_opt()?;
    }
    None
}

fn matches_pattern(pattern: &Pattern, date: NaiveDate) -> bool {
    match pattern {
        Pattern::Weekday(w) => date.weekday() == *w,
        Pattern::Templated { year, month, day } => {
            year_matches(*year, date.year()) && month_matches(*month, date.month()) && day.map_or(true, |d| d == date.day())
        }
    }
}

fn year_matches(field: YearField, year: i32) -> bool {
    match field {
        YearField::Any => true,
        YearField::Even => year % 2 == 0,
        YearField::Odd => year % 2 != 0,
        YearField::Fixed(y) => y == year,
    }
}

fn month_matches(field: MonthField, month: u32) -> bool {
    match field {
        MonthField::Any => true,
        MonthField::Even => month % 2 == 0,
        MonthField::Odd => month % 2 != 0,
        MonthField::Fixed(m) => m == month,
    }
}

/// Convenience used by callers that only have the raw tag (e.g. `reminder-every-${tuesday}`).
pub fn next_occurrence_for_tag(tag: &str, now: NaiveDate) -> Option<NaiveDate> {
    let expr = tag.strip_prefix("reminder-").unwrap_or(tag);
    let parsed = parse(expr)?;
    next_occurrence(&parsed, now)
}
