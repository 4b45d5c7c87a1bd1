mod application;
mod domain;
mod infrastructure;

use application::bootstrap::bootstrap_workspace;
use application::commands::{
    create_goal_impl, get_goal_impl, load_goal_impl, mark_done_impl, reset_goal_impl,
    undo_today_impl, update_goal_impl, AppState, GoalStateResponse,
};
use domain::models::{Goal, GoalInput, GoalPatch};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
struct BootstrapResponse {
    workspace_root: String,
    database_path: String,
}

#[tauri::command]
fn bootstrap(root: Option<String>) -> Result<BootstrapResponse, String> {
    let workspace_root = match root {
        Some(path) => PathBuf::from(path),
        None => std::env::current_dir().map_err(|error| error.to_string())?,
    };

    let result = bootstrap_workspace(&workspace_root).map_err(|error| error.to_string())?;
    Ok(BootstrapResponse {
        workspace_root: result.workspace_root.display().to_string(),
        database_path: result.database_path.display().to_string(),
    })
}

#[tauri::command]
fn ping() -> &'static str {
    "pong"
}

#[tauri::command]
fn get_goal(state: tauri::State<'_, AppState>) -> Result<GoalStateResponse, String> {
    get_goal_impl(state.inner()).map_err(|error| state.command_error("get_goal", &error))
}

#[tauri::command]
fn load_goal(state: tauri::State<'_, AppState>) -> Result<Option<Goal>, String> {
    load_goal_impl(state.inner()).map_err(|error| state.command_error("load_goal", &error))
}

#[tauri::command]
fn create_goal(
    state: tauri::State<'_, AppState>,
    title: String,
    total_days: f64,
    accent_color: Option<String>,
) -> Result<Goal, String> {
    let input = GoalInput {
        title,
        total_days,
        accent_color,
    };
    create_goal_impl(state.inner(), input).map_err(|error| state.command_error("create_goal", &error))
}

#[tauri::command]
fn mark_done(state: tauri::State<'_, AppState>) -> Result<bool, String> {
    mark_done_impl(state.inner()).map_err(|error| state.command_error("mark_done", &error))
}

#[tauri::command]
fn undo_today(state: tauri::State<'_, AppState>) -> Result<bool, String> {
    undo_today_impl(state.inner()).map_err(|error| state.command_error("undo_today", &error))
}

#[tauri::command]
fn reset_goal(state: tauri::State<'_, AppState>) -> Result<(), String> {
    reset_goal_impl(state.inner()).map_err(|error| state.command_error("reset_goal", &error))
}

#[tauri::command]
fn update_goal(
    state: tauri::State<'_, AppState>,
    title: Option<String>,
    total_days: Option<f64>,
    completed_days: Option<f64>,
    last_completed_date: Option<String>,
    clear_last_completed_date: Option<bool>,
    accent_color: Option<String>,
) -> Result<Option<Goal>, String> {
    let patch = GoalPatch {
        title,
        total_days,
        completed_days,
        last_completed_date: if clear_last_completed_date.unwrap_or(false) {
            Some(None)
        } else {
            last_completed_date.map(Some)
        },
        accent_color,
    };
    update_goal_impl(state.inner(), patch).map_err(|error| state.command_error("update_goal", &error))
}

pub fn run() {
    let workspace_root = std::env::current_dir().expect("failed to resolve current directory");
    let app_state = AppState::new(workspace_root).expect("failed to initialize app state");

    tauri::Builder::default()
        .manage(app_state)
        .invoke_handler(tauri::generate_handler![
            ping,
            bootstrap,
            get_goal,
            load_goal,
            create_goal,
            mark_done,
            undo_today,
            reset_goal,
            update_goal
        ])
        .run(tauri::generate_context!())
        .expect("failed to run tauri app");
}
