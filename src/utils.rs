//! Helpers exposed to templates as globals.
//!
//! Both are plain functions over their inputs; the template glue in
//! `templates` feeds them the current request and the current time.

use chrono::{DateTime, Utc};

/// Builds the URL of `path` with the `page` query parameter set to `page`.
///
/// Every other query parameter is kept in its original order. An existing
/// `page` keeps its position; a missing one is appended.
pub fn url_for_other_page(path: &str, query: &str, page: i64) -> String {
    let mut pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_default();

    let mut replaced = false;
    pairs.retain_mut(|(key, value)| {
        if key != "page" {
            return true;
        }
        if replaced {
            return false;
        }
        *value = page.to_string();
        replaced = true;
        true
    });
    if !replaced {
        pairs.push(("page".to_string(), page.to_string()));
    }

    match serde_urlencoded::to_string(&pairs) {
        Ok(encoded) => format!("{}?{}", path, encoded),
        Err(_) => format!("{}?page={}", path, page),
    }
}

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

/// Renders `then` relative to `now`: "just now", "3 minutes ago", "in 2 days".
pub fn timeago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(then).num_seconds();
    let seconds = delta.abs();

    if seconds < 10 {
        return "just now".to_string();
    }

    let (amount, unit) = match seconds {
        s if s < MINUTE => (s, "second"),
        s if s < HOUR => (s / MINUTE, "minute"),
        s if s < DAY => (s / HOUR, "hour"),
        s if s < WEEK => (s / DAY, "day"),
        s if s < MONTH => (s / WEEK, "week"),
        s if s < YEAR => (s / MONTH, "month"),
        s => (s / YEAR, "year"),
    };
    let plural = if amount == 1 { "" } else { "s" };

    if delta > 0 {
        format!("{} {}{} ago", amount, unit, plural)
    } else {
        format!("in {} {}{}", amount, unit, plural)
    }
}

/// `timeago` against the current wall clock.
pub fn timeago_now(then: DateTime<Utc>) -> String {
    timeago(then, Utc::now())
}
