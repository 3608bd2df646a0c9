//! Small free helpers shared by the panel modules.

use chrono::{Days, NaiveDate};
use serde_json::Value;

/// Last element of a sequence, if any.
pub fn last<T>(items: &[T]) -> Option<&T> {
    items.last()
}

/// `date` shifted by `n` days (negative moves backwards).
///
/// Saturates at the calendar bounds rather than wrapping.
#[must_use]
pub fn add_days(date: NaiveDate, n: i64) -> NaiveDate {
    let shifted = if n >= 0 {
        date.checked_add_days(Days::new(n.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(n.unsigned_abs()))
    };
    shifted.unwrap_or(if n >= 0 {
        NaiveDate::MAX
    } else {
        NaiveDate::MIN
    })
}

/// Labels for the quick hold buttons: the next `count` days after `today`,
/// formatted like `Tue 3 Jun`.
#[must_use]
pub fn hold_day_labels(today: NaiveDate, count: u8) -> Vec<String> {
    (1..=i64::from(count))
        .map(|i| add_days(today, i).format("%a %-d %b").to_string())
        .collect()
}

/// Text form of a JSON value as the controller's web page showed it:
/// arrays flatten and join with `,`, `null` is empty, objects are opaque.
#[must_use]
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}
