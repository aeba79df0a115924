use tauri::{Manager, RunEvent, WindowEvent};

use crate::{
    logging,
    main_window::WindowLifecycle,
    shell_config::{ShellConfig, UpdateEngineConfig},
    update_coordinator::UpdateCoordinator,
    update_engine::TauriUpdateEngine,
};

pub(crate) fn run() {
    let config = ShellConfig::from_env();

    tauri::Builder::default()
        // Must be registered first so a second instance exits before any setup runs.
        .plugin(tauri_plugin_single_instance::init(|app_handle, argv, _cwd| {
            log::info!("second instance launch detected (argv={argv:?})");
            app_handle.state::<WindowLifecycle>().refocus_primary();
        }))
        .plugin(logging::plugin())
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_updater::Builder::new().build())
        .manage(config.clone())
        .manage(WindowLifecycle::default())
        .invoke_handler(tauri::generate_handler![
            crate::desktop_bridge_commands::bridge_invoke,
        ])
        .on_window_event(|window, event| {
            if let WindowEvent::Destroyed = event {
                window
                    .app_handle()
                    .state::<WindowLifecycle>()
                    .handle_window_destroyed(window.label());
            }
        })
        .setup(move |app| {
            log::info!(
                "shell host starting: version={} packaged={} platform={:?} dev_server={}",
                app.package_info().version,
                config.packaged,
                config.platform,
                config
                    .dev_server_url
                    .as_ref()
                    .map(|url| url.as_str())
                    .unwrap_or("none")
            );

            let app_handle = app.handle().clone();
            let engine = TauriUpdateEngine::new(app_handle.clone(), UpdateEngineConfig::default());
            app.manage(UpdateCoordinator::new(engine, config.packaged));

            let lifecycle = app.state::<WindowLifecycle>();
            lifecycle.create_primary_window(&app_handle, &config)?;
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app_handle, event| match event {
            RunEvent::ExitRequested { code, api, .. } => {
                // `code` is `None` when the last window closed rather than an explicit exit.
                if code.is_none() {
                    let platform = app_handle.state::<ShellConfig>().platform;
                    let should_exit = app_handle
                        .state::<WindowLifecycle>()
                        .handle_all_windows_closed(platform);
                    if !should_exit {
                        api.prevent_exit();
                    }
                }
            }
            #[cfg(target_os = "macos")]
            RunEvent::Reopen { .. } => {
                let config = app_handle.state::<ShellConfig>();
                app_handle
                    .state::<WindowLifecycle>()
                    .handle_activate(app_handle, &config);
            }
            RunEvent::Exit => {
                log::info!("shell host exiting");
            }
            _ => {}
        });
}
