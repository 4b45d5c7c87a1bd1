use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The single persisted goal. Field names follow the camelCase wire format the
/// companion widget and previously persisted records use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub title: String,
    pub total_days: i64,
    pub completed_days: i64,
    pub last_completed_date: Option<String>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoalInput {
    pub title: String,
    pub total_days: f64,
    pub accent_color: Option<String>,
}

/// Partial update. Every field distinguishes "omitted" from "supplied";
/// `last_completed_date` additionally distinguishes "supplied as cleared"
/// (`Some(None)`) from "omitted" (`None`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalPatch {
    pub title: Option<String>,
    pub total_days: Option<f64>,
    pub completed_days: Option<f64>,
    pub last_completed_date: Option<Option<String>>,
    pub accent_color: Option<String>,
}

/// Read-only projection handed to the widget host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSnapshot {
    pub title: String,
    pub total_days: i64,
    pub completed_days: i64,
    pub last_completed_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,
    pub updated_at: String,
}

pub fn build_widget_snapshot(goal: &Goal) -> WidgetSnapshot {
    WidgetSnapshot {
        title: goal.title.clone(),
        total_days: goal.total_days,
        completed_days: goal.completed_days,
        last_completed_date: goal.last_completed_date.clone(),
        accent_color: goal.accent_color.clone(),
        updated_at: Utc::now().to_rfc3339(),
    }
}

/// Truncates the fractional part and floors the result at one day.
pub fn normalized_total_days(raw: f64) -> i64 {
    if raw.is_finite() {
        (raw.floor() as i64).max(1)
    } else {
        1
    }
}

pub fn clamp_completed_days(raw: i64, total_days: i64) -> i64 {
    raw.clamp(0, total_days)
}

/// `\d{4}-\d{2}-\d{2}`: the shape check the daily gate relies on. Calendar
/// validity is not checked here, matching records persisted by earlier app
/// versions.
pub fn is_date_string(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(index, byte)| match index {
            4 | 7 => *byte == b'-',
            _ => byte.is_ascii_digit(),
        })
}

fn finite_floor(value: &Value) -> Option<i64> {
    value
        .as_f64()
        .filter(|number| number.is_finite())
        .map(|number| number.floor() as i64)
}

/// Turns an arbitrary decoded value into a well-formed `Goal`, or rejects it.
///
/// Rejects when the value is not an object, `title` is missing/not text/blank,
/// `totalDays` does not truncate to a positive integer, `createdAt` is
/// missing/not text/blank, or `lastCompletedDate` is text that does not match
/// `YYYY-MM-DD`. Everything else is coerced: `completedDays` defaults to 0 and
/// is clamped into `[0, totalDays]`, a non-text `lastCompletedDate` becomes
/// absent, a non-text `accentColor` is dropped.
pub fn normalize_goal(raw: &Value) -> Option<Goal> {
    let object = raw.as_object()?;

    let title = object
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())?
        .to_string();

    let total_days = object.get("totalDays").and_then(finite_floor).unwrap_or(0);
    if total_days <= 0 {
        return None;
    }

    let created_at = object
        .get("createdAt")
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())?
        .to_string();

    let completed_days = object
        .get("completedDays")
        .and_then(finite_floor)
        .unwrap_or(0);

    let last_completed_date = match object.get("lastCompletedDate") {
        Some(Value::String(value)) => {
            if !is_date_string(value) {
                return None;
            }
            Some(value.clone())
        }
        _ => None,
    };

    let accent_color = object
        .get("accentColor")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned);

    Some(Goal {
        title,
        total_days,
        completed_days: clamp_completed_days(completed_days, total_days),
        last_completed_date,
        created_at,
        accent_color,
    })
}
