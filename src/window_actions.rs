use tauri::{AppHandle, Manager, WebviewWindow};

/// Un-minimizes, shows and focuses `window`. Failures are logged only.
pub fn restore_and_focus(window: &WebviewWindow) {
    match window.is_minimized() {
        Ok(true) => {
            if let Err(error) = window.unminimize() {
                log::warn!(
                    "failed to restore window {}: {error}",
                    window.label()
                );
            }
        }
        Ok(false) => {}
        Err(error) => log::warn!(
            "failed to read minimized state of window {}: {error}",
            window.label()
        ),
    }

    if let Err(error) = window.show() {
        log::warn!("failed to show window {}: {error}", window.label());
    }
    if let Err(error) = window.set_focus() {
        log::warn!("failed to focus window {}: {error}", window.label());
    }
}

/// Picks the window activation should focus: `preferred` if it is still open,
/// otherwise the lowest label so the choice is stable.
pub fn first_open_window(app_handle: &AppHandle, preferred: &str) -> Option<WebviewWindow> {
    let windows = app_handle.webview_windows();
    if let Some(window) = windows.get(preferred) {
        return Some(window.clone());
    }

    windows
        .into_iter()
        .min_by(|(left, _), (right, _)| left.cmp(right))
        .map(|(_, window)| window)
}
