#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app_constants;
mod app_runtime;
mod app_types;
mod bridge;
mod desktop_bridge_commands;
mod download_progress;
mod logging;
mod main_window;
mod navigation_policy;
mod shell_config;
mod update_coordinator;
mod update_engine;
mod update_error;
mod window_actions;

pub(crate) use app_constants::*;

fn main() {
    app_runtime::run();
}
