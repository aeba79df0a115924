use tauri::{AppHandle, Manager, WebviewWindow};

use crate::{
    app_types::CheckUpdateResponse,
    bridge::{BridgeCommand, WebviewEventSink},
    main_window::WindowLifecycle,
    shell_config::ShellConfig,
    update_coordinator::ShellUpdateCoordinator,
};

fn log_update_status(coordinator: &ShellUpdateCoordinator, after: &str) {
    let status = coordinator.status();
    log::debug!(
        "update phases after {after}: check={:?} download={:?} last_check={:?}",
        status.check,
        status.download,
        status.last_check
    );
}

/// Single IPC entry point. `channel` must be one of the bridge command names;
/// anything else rejects the invoke.
#[tauri::command]
pub(crate) async fn bridge_invoke(
    app_handle: AppHandle,
    webview_window: WebviewWindow,
    channel: String,
    arg: Option<String>,
) -> Result<Option<CheckUpdateResponse>, String> {
    let command = BridgeCommand::parse(&channel, arg).map_err(|error| {
        log::warn!(
            "rejected bridge invoke from {}: {error}",
            webview_window.label()
        );
        error.to_string()
    })?;
    log::debug!(
        "bridge command {} from {}",
        command.channel(),
        webview_window.label()
    );

    let sink = WebviewEventSink::new(app_handle.clone(), webview_window.label());
    match command {
        BridgeCommand::OpenWindow { fragment } => {
            let lifecycle = app_handle.state::<WindowLifecycle>();
            let config = app_handle.state::<ShellConfig>();
            if let Err(error) = lifecycle.open_secondary_window(&app_handle, &config, &fragment) {
                log::error!("failed to open secondary window '{fragment}': {error}");
            }
            Ok(None)
        }
        BridgeCommand::CheckUpdate => {
            let coordinator = app_handle.state::<ShellUpdateCoordinator>();
            let response = coordinator.check_update(&sink).await;
            log_update_status(&coordinator, "check");
            Ok(Some(response))
        }
        BridgeCommand::StartDownload => {
            let task_app_handle = app_handle.clone();
            tauri::async_runtime::spawn(async move {
                let coordinator = task_app_handle.state::<ShellUpdateCoordinator>();
                coordinator.start_download(&sink).await;
                log_update_status(&coordinator, "download");
            });
            Ok(None)
        }
        BridgeCommand::QuitAndInstall => {
            let coordinator = app_handle.state::<ShellUpdateCoordinator>();
            coordinator.quit_and_install(&sink);
            Ok(None)
        }
    }
}
