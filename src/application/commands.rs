use crate::application::bootstrap::bootstrap_workspace;
use crate::domain::dates::{can_mark_done, can_undo_today, local_date_string};
use crate::domain::models::{
    build_widget_snapshot, clamp_completed_days, normalize_goal, normalized_total_days, Goal,
    GoalInput, GoalPatch,
};
use crate::infrastructure::config::read_timezone;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::kv_store::{KeyValueStore, SqliteKeyValueStore};
use crate::infrastructure::widget_bridge::{platform_widget_bridge, WidgetBridge};
use chrono::{Local, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

pub const GOAL_STORAGE_KEY: &str = "one-goal/active-goal";

pub struct AppState {
    store: Arc<dyn KeyValueStore>,
    widget_bridge: Arc<dyn WidgetBridge>,
    timezone: Option<Tz>,
    logs_dir: PathBuf,
    runtime: Mutex<RuntimeState>,
    log_guard: Mutex<()>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let config_dir = workspace_root.join("config");
        let state_dir = workspace_root.join("state");
        let logs_dir = workspace_root.join("logs");

        let configured_timezone = read_timezone(&config_dir)?;
        let store: Arc<dyn KeyValueStore> =
            Arc::new(SqliteKeyValueStore::new(&bootstrap.database_path));
        let widget_bridge = platform_widget_bridge(&state_dir);

        let mut state = Self {
            store,
            widget_bridge,
            timezone: None,
            logs_dir,
            runtime: Mutex::new(RuntimeState::default()),
            log_guard: Mutex::new(()),
        };
        if let Some(name) = configured_timezone {
            match name.parse::<Tz>() {
                Ok(timezone) => state.timezone = Some(timezone),
                Err(_) => {
                    state.log_error("bootstrap", &format!("ignoring invalid timezone '{name}'"));
                }
            }
        }
        Ok(state)
    }

    /// Injection constructor: same state machine over caller-supplied
    /// storage and widget collaborators.
    pub fn with_components(
        workspace_root: PathBuf,
        store: Arc<dyn KeyValueStore>,
        widget_bridge: Arc<dyn WidgetBridge>,
    ) -> Result<Self, InfraError> {
        let logs_dir = workspace_root.join("logs");
        fs::create_dir_all(&logs_dir)?;

        Ok(Self {
            store,
            widget_bridge,
            timezone: None,
            logs_dir,
            runtime: Mutex::new(RuntimeState::default()),
            log_guard: Mutex::new(()),
        })
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub fn widget_bridge(&self) -> &dyn WidgetBridge {
        self.widget_bridge.as_ref()
    }

    /// Current calendar date for the daily gate, in the configured timezone
    /// when one is set, otherwise in the device-local timezone.
    pub fn today(&self) -> String {
        match self.timezone {
            Some(timezone) => local_date_string(Utc::now().with_timezone(&timezone).date_naive()),
            None => local_date_string(Local::now().date_naive()),
        }
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

#[derive(Debug, Default)]
struct RuntimeState {
    goal: Option<Goal>,
    is_loading: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GoalStateResponse {
    pub goal: Option<Goal>,
    pub is_loading: bool,
}

pub fn get_goal_impl(state: &AppState) -> Result<GoalStateResponse, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(GoalStateResponse {
        goal: runtime.goal.clone(),
        is_loading: runtime.is_loading,
    })
}

/// Loads the persisted goal into memory. Always resolves to either a valid
/// goal or no goal: an unreadable or invalid record is deleted and reported
/// as absent, never surfaced to the caller.
pub fn load_goal_impl(state: &AppState) -> Result<Option<Goal>, InfraError> {
    {
        let mut runtime = lock_runtime(state)?;
        runtime.is_loading = true;
    }

    let loaded = read_persisted_goal(state);

    let mut runtime = lock_runtime(state)?;
    runtime.goal = loaded.clone();
    runtime.is_loading = false;
    Ok(loaded)
}

/// Replaces any existing goal outright. The UI owns any confirmation step.
pub fn create_goal_impl(state: &AppState, input: GoalInput) -> Result<Goal, InfraError> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(InfraError::InvalidConfig(
            "title must not be empty".to_string(),
        ));
    }

    let goal = Goal {
        title: title.to_string(),
        total_days: normalized_total_days(input.total_days),
        completed_days: 0,
        last_completed_date: None,
        created_at: Utc::now().to_rfc3339(),
        accent_color: input
            .accent_color
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned),
    };

    {
        let mut runtime = lock_runtime(state)?;
        runtime.goal = Some(goal.clone());
    }

    persist_goal(state, Some(&goal));
    sync_widget(state, Some(&goal));
    state.log_info(
        "create_goal",
        &format!("created goal spanning {} day(s)", goal.total_days),
    );
    Ok(goal)
}

/// Marks today complete. Returns `Ok(false)` without touching state when no
/// goal exists, today is gated by the once-per-day rule, or the goal is
/// already at its target.
pub fn mark_done_impl(state: &AppState) -> Result<bool, InfraError> {
    let today = state.today();

    let next_goal = {
        let mut runtime = lock_runtime(state)?;
        let Some(goal) = runtime.goal.as_ref() else {
            return Ok(false);
        };

        if !can_mark_done(&today, goal.last_completed_date.as_deref()) {
            return Ok(false);
        }
        if goal.completed_days >= goal.total_days || goal.total_days <= 0 {
            return Ok(false);
        }

        let next = Goal {
            completed_days: goal.completed_days + 1,
            last_completed_date: Some(today),
            ..goal.clone()
        };
        runtime.goal = Some(next.clone());
        next
    };

    persist_goal(state, Some(&next_goal));
    sync_widget(state, Some(&next_goal));
    Ok(true)
}

/// Reverts today's own completion only. Clears the completion marker so the
/// day can be marked again.
pub fn undo_today_impl(state: &AppState) -> Result<bool, InfraError> {
    let today = state.today();

    let next_goal = {
        let mut runtime = lock_runtime(state)?;
        let Some(goal) = runtime.goal.as_ref() else {
            return Ok(false);
        };

        if !can_undo_today(&today, goal.last_completed_date.as_deref()) {
            return Ok(false);
        }
        if goal.completed_days <= 0 {
            return Ok(false);
        }

        let next = Goal {
            completed_days: goal.completed_days - 1,
            last_completed_date: None,
            ..goal.clone()
        };
        runtime.goal = Some(next.clone());
        next
    };

    persist_goal(state, Some(&next_goal));
    sync_widget(state, Some(&next_goal));
    Ok(true)
}

/// Clears everything: in-memory state, the persisted record, the widget
/// snapshot. Safe to call when no goal exists.
pub fn reset_goal_impl(state: &AppState) -> Result<(), InfraError> {
    {
        let mut runtime = lock_runtime(state)?;
        runtime.goal = None;
    }

    persist_goal(state, None);
    sync_widget(state, None);
    state.log_info("reset_goal", "cleared active goal");
    Ok(())
}

/// Applies a partial patch to the active goal, re-clamping everything back
/// into range. Returns `Ok(None)` when no goal exists.
pub fn update_goal_impl(state: &AppState, patch: GoalPatch) -> Result<Option<Goal>, InfraError> {
    let next_goal = {
        let mut runtime = lock_runtime(state)?;
        let Some(current) = runtime.goal.as_ref() else {
            return Ok(None);
        };

        let title = patch
            .title
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| current.title.clone());

        let total_days = patch
            .total_days
            .map(normalized_total_days)
            .unwrap_or(current.total_days);

        let completed_was_supplied = patch.completed_days.is_some();
        let completed_days = clamp_completed_days(
            patch
                .completed_days
                .filter(|value| value.is_finite())
                .map(|value| value.floor() as i64)
                .unwrap_or(if completed_was_supplied {
                    0
                } else {
                    current.completed_days
                }),
            total_days,
        );

        // An explicit date wins; a manual completedDays edit invalidates the
        // "already done today" marker; otherwise the marker is inherited.
        let last_completed_date = match patch.last_completed_date {
            Some(explicit) => explicit,
            None if completed_was_supplied => None,
            None => current.last_completed_date.clone(),
        };
        let last_completed_date = if completed_days == 0 {
            None
        } else {
            last_completed_date
        };

        let accent_color = match patch.accent_color {
            Some(color) => Some(color),
            None => current.accent_color.clone(),
        };

        let next = Goal {
            title,
            total_days,
            completed_days,
            last_completed_date,
            created_at: current.created_at.clone(),
            accent_color,
        };
        runtime.goal = Some(next.clone());
        next
    };

    persist_goal(state, Some(&next_goal));
    sync_widget(state, Some(&next_goal));
    Ok(Some(next_goal))
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
    state
        .runtime
        .lock()
        .map_err(|error| InfraError::State(format!("goal state lock poisoned: {error}")))
}

fn read_persisted_goal(state: &AppState) -> Option<Goal> {
    let raw = match state.store().get(GOAL_STORAGE_KEY) {
        Ok(raw) => raw,
        Err(error) => {
            state.log_error("load_goal", &format!("storage read failed: {error}"));
            discard_persisted_goal(state);
            return None;
        }
    };
    let raw = raw?;

    let parsed: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(parsed) => parsed,
        Err(error) => {
            state.log_error(
                "load_goal",
                &format!("discarding unreadable goal record: {error}"),
            );
            discard_persisted_goal(state);
            return None;
        }
    };

    match normalize_goal(&parsed) {
        Some(goal) => Some(goal),
        None => {
            state.log_error("load_goal", "discarding invalid goal record");
            discard_persisted_goal(state);
            None
        }
    }
}

fn discard_persisted_goal(state: &AppState) {
    if let Err(error) = state.store().remove(GOAL_STORAGE_KEY) {
        state.log_error(
            "load_goal",
            &format!("failed to remove goal record: {error}"),
        );
    }
}

// Persistence and widget sync are best-effort mirrors of the in-memory goal:
// failures are logged and dropped, and the next successful mutation
// re-persists the then-current state.
fn persist_goal(state: &AppState, goal: Option<&Goal>) {
    let result = match goal {
        Some(goal) => serde_json::to_string(goal)
            .map_err(InfraError::from)
            .and_then(|payload| state.store().set(GOAL_STORAGE_KEY, &payload)),
        None => state.store().remove(GOAL_STORAGE_KEY),
    };
    if let Err(error) = result {
        state.log_error("persist_goal", &format!("goal persistence failed: {error}"));
    }
}

fn sync_widget(state: &AppState, goal: Option<&Goal>) {
    let result = match goal {
        Some(goal) => serde_json::to_string(&build_widget_snapshot(goal))
            .map_err(InfraError::from)
            .and_then(|payload| state.widget_bridge().write_snapshot(&payload)),
        None => state.widget_bridge().clear_snapshot(),
    };
    match result {
        Ok(()) => state.widget_bridge().reload_widgets(),
        Err(error) => state.log_error("sync_widget", &format!("widget sync failed: {error}")),
    }
}
