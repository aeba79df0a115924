use std::{
    fmt::Display,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use chrono::{DateTime, Local, TimeZone};
use tauri::{
    webview::{NewWindowResponse, PageLoadEvent},
    window::Color,
    AppHandle, LogicalPosition, LogicalSize, Manager, Url, WebviewUrl, WebviewWindow,
    WebviewWindowBuilder,
};
use tauri_plugin_opener::OpenerExt;

use crate::{
    bridge::{BridgeEvent, EventSink, WebviewEventSink},
    navigation_policy::{self, NavigationDecision},
    shell_config::{DocumentLocation, Platform, ShellConfig},
    window_actions, FALLBACK_WINDOW_HEIGHT, FALLBACK_WINDOW_WIDTH, MAIN_WINDOW_LABEL,
    MAIN_WINDOW_TITLE, SECONDARY_WINDOW_LABEL_PREFIX,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ActivationDecision {
    FocusExisting,
    RecreatePrimary,
}

pub(crate) fn activation_decision(open_windows: usize) -> ActivationDecision {
    if open_windows > 0 {
        ActivationDecision::FocusExisting
    } else {
        ActivationDecision::RecreatePrimary
    }
}

pub(crate) fn should_exit_when_all_windows_closed(platform: Platform) -> bool {
    !platform.keeps_running_without_windows()
}

/// Local time in the `YYYY/M/D HH:MM:SS` form the UI displays verbatim.
pub(crate) fn greeting_timestamp<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.format("%Y/%-m/%-d %H:%M:%S").to_string()
}

fn webview_url(location: DocumentLocation) -> WebviewUrl {
    match location {
        DocumentLocation::DevServer(url) => WebviewUrl::External(url),
        DocumentLocation::Packaged(path) => WebviewUrl::App(path.into()),
    }
}

/// Applies a link decision. Returns whether the webview may load `target` in place.
fn route_link(app_handle: &AppHandle, target: &Url, decision: NavigationDecision) -> bool {
    match decision {
        NavigationDecision::Allow => true,
        NavigationDecision::OpenExternal => {
            log::info!("forwarding external link to system browser: {target}");
            if let Err(error) = app_handle.opener().open_url(target.as_str(), None::<&str>) {
                log::warn!("failed to open external link {target}: {error}");
            }
            false
        }
        NavigationDecision::Deny => {
            log::info!("link denied: {target}");
            false
        }
    }
}

/// Lets the greeting through once per primary window.
#[derive(Debug, Default)]
pub(crate) struct GreetingLatch {
    fired: AtomicBool,
}

impl GreetingLatch {
    pub(crate) fn should_greet(&self, event: PageLoadEvent) -> bool {
        matches!(event, PageLoadEvent::Finished) && !self.fired.swap(true, Ordering::AcqRel)
    }
}

/// Single-slot registry for the primary window.
pub(crate) struct WindowSlot<W> {
    window: Mutex<Option<W>>,
}

impl<W> Default for WindowSlot<W> {
    fn default() -> Self {
        Self {
            window: Mutex::new(None),
        }
    }
}

impl<W: Clone> WindowSlot<W> {
    pub(crate) fn get(&self) -> Option<W> {
        self.window.lock().ok().and_then(|guard| guard.clone())
    }

    fn set(&self, window: Option<W>) {
        match self.window.lock() {
            Ok(mut guard) => *guard = window,
            Err(error) => log::error!("primary window slot poisoned: {error}"),
        }
    }

    pub(crate) fn clear(&self) {
        self.set(None);
    }

    /// Returns the occupant and `false` when the slot is already filled;
    /// otherwise runs `create`, stores the result and returns it with `true`.
    pub(crate) fn get_or_try_create<E>(
        &self,
        create: impl FnOnce() -> Result<W, E>,
    ) -> Result<(W, bool), E> {
        if let Some(existing) = self.get() {
            return Ok((existing, false));
        }
        let window = create()?;
        self.set(Some(window.clone()));
        Ok((window, true))
    }

    /// Clears the slot when the destroyed window was the primary one.
    pub(crate) fn release_on_destroy(&self, label: &str) -> bool {
        if label != MAIN_WINDOW_LABEL {
            return false;
        }
        self.clear();
        true
    }
}

fn primary_display_bounds(app_handle: &AppHandle) -> (LogicalPosition<f64>, LogicalSize<f64>) {
    let fallback = (
        LogicalPosition::new(0.0, 0.0),
        LogicalSize::new(FALLBACK_WINDOW_WIDTH, FALLBACK_WINDOW_HEIGHT),
    );

    match app_handle.primary_monitor() {
        Ok(Some(monitor)) => {
            let scale_factor = monitor.scale_factor();
            (
                monitor.position().to_logical(scale_factor),
                monitor.size().to_logical(scale_factor),
            )
        }
        Ok(None) => {
            log::warn!("no primary display reported; using fallback window bounds");
            fallback
        }
        Err(error) => {
            log::warn!("failed to query primary display: {error}; using fallback window bounds");
            fallback
        }
    }
}

fn build_primary_window(
    app_handle: &AppHandle,
    config: &ShellConfig,
) -> tauri::Result<WebviewWindow> {
    let (position, size) = primary_display_bounds(app_handle);
    let navigation_origin = config.app_origin();
    let popup_origin = navigation_origin.clone();
    let navigation_app = app_handle.clone();
    let popup_app = app_handle.clone();
    let greeting = GreetingLatch::default();

    let mut builder = WebviewWindowBuilder::new(
        app_handle,
        MAIN_WINDOW_LABEL,
        webview_url(config.document_location(None)),
    )
    .title(MAIN_WINDOW_TITLE)
    .position(position.x, position.y)
    .inner_size(size.width, size.height)
    .decorations(false)
    .transparent(true)
    .always_on_top(true)
    .shadow(false)
    .on_navigation(move |url| {
        route_link(
            &navigation_app,
            url,
            navigation_policy::decide(url, &navigation_origin),
        )
    })
    .on_new_window(move |url, _features| {
        route_link(
            &popup_app,
            &url,
            navigation_policy::decide_new_window(&url, &popup_origin),
        );
        NewWindowResponse::Deny
    })
    .on_page_load(move |window, payload| {
        if !greeting.should_greet(payload.event()) {
            return;
        }
        let sink = WebviewEventSink::new(window.app_handle().clone(), window.label());
        sink.emit(BridgeEvent::MainProcessMessage(greeting_timestamp(
            &Local::now(),
        )));
    });

    if config.platform.needs_transparent_background_shim() {
        builder = builder.background_color(Color(0, 0, 0, 0));
    }

    let window = builder.build()?;
    log::info!("primary window created at {}x{}", size.width, size.height);

    #[cfg(debug_assertions)]
    if config.dev_server_url.is_some() {
        window.open_devtools();
    }

    Ok(window)
}

/// Owns the single primary window slot.
///
/// At most one primary window exists at a time. The slot is cleared when the
/// window is destroyed and refilled on reactivation.
#[derive(Default)]
pub(crate) struct WindowLifecycle {
    primary: WindowSlot<WebviewWindow>,
    secondary_count: AtomicUsize,
}

impl WindowLifecycle {
    pub(crate) fn primary(&self) -> Option<WebviewWindow> {
        self.primary.get()
    }

    pub(crate) fn create_primary_window(
        &self,
        app_handle: &AppHandle,
        config: &ShellConfig,
    ) -> tauri::Result<WebviewWindow> {
        let (window, created) = self
            .primary
            .get_or_try_create(|| build_primary_window(app_handle, config))?;
        if !created {
            log::info!("primary window already exists; focusing instead of creating");
            window_actions::restore_and_focus(&window);
        }
        Ok(window)
    }

    /// Second launch attempt: bring the existing window forward, never create one.
    pub(crate) fn refocus_primary(&self) {
        match self.primary() {
            Some(window) => window_actions::restore_and_focus(&window),
            None => log::info!("second instance detected with no primary window to focus"),
        }
    }

    pub(crate) fn handle_window_destroyed(&self, label: &str) {
        if self.primary.release_on_destroy(label) {
            log::info!("primary window destroyed");
        }
    }

    /// Returns whether the process should exit now that no windows remain.
    pub(crate) fn handle_all_windows_closed(&self, platform: Platform) -> bool {
        self.primary.clear();
        let exit = should_exit_when_all_windows_closed(platform);
        if !exit {
            log::info!("all windows closed; staying resident until reactivated");
        }
        exit
    }

    pub(crate) fn handle_activate(&self, app_handle: &AppHandle, config: &ShellConfig) {
        let open_windows = app_handle.webview_windows().len();
        match activation_decision(open_windows) {
            ActivationDecision::FocusExisting => {
                if let Some(window) = window_actions::first_open_window(app_handle, MAIN_WINDOW_LABEL)
                {
                    window_actions::restore_and_focus(&window);
                }
            }
            ActivationDecision::RecreatePrimary => {
                if let Err(error) = self.create_primary_window(app_handle, config) {
                    log::error!("failed to recreate primary window on activation: {error}");
                }
            }
        }
    }

    pub(crate) fn open_secondary_window(
        &self,
        app_handle: &AppHandle,
        config: &ShellConfig,
        fragment: &str,
    ) -> tauri::Result<WebviewWindow> {
        let index = self.secondary_count.fetch_add(1, Ordering::Relaxed) + 1;
        let label = format!("{SECONDARY_WINDOW_LABEL_PREFIX}{index}");
        let window = WebviewWindowBuilder::new(
            app_handle,
            label.as_str(),
            webview_url(config.document_location(Some(fragment))),
        )
        .build()?;
        log::info!("secondary window {label} opened at fragment '{fragment}'");
        Ok(window)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};

    use super::*;

    #[test]
    fn activation_focuses_when_any_window_is_open() {
        assert_eq!(activation_decision(1), ActivationDecision::FocusExisting);
        assert_eq!(activation_decision(3), ActivationDecision::FocusExisting);
    }

    #[test]
    fn activation_recreates_primary_when_no_window_is_open() {
        assert_eq!(activation_decision(0), ActivationDecision::RecreatePrimary);
    }

    #[test]
    fn closing_all_windows_exits_everywhere_but_macos() {
        assert!(should_exit_when_all_windows_closed(Platform::Windows));
        assert!(should_exit_when_all_windows_closed(Platform::Linux));
        assert!(should_exit_when_all_windows_closed(Platform::Other));
        assert!(!should_exit_when_all_windows_closed(Platform::MacOs));
    }

    #[test]
    fn handle_all_windows_closed_follows_platform_rule() {
        let lifecycle = WindowLifecycle::default();
        assert!(lifecycle.handle_all_windows_closed(Platform::Linux));
        assert!(!lifecycle.handle_all_windows_closed(Platform::MacOs));
        assert!(lifecycle.primary().is_none());
    }

    #[test]
    fn window_slot_creates_once_and_returns_existing_afterwards() {
        let slot = WindowSlot::<String>::default();
        let mut builds = 0;

        let first = slot.get_or_try_create(|| {
            builds += 1;
            Ok::<_, ()>("main#1".to_string())
        });
        let second = slot.get_or_try_create(|| {
            builds += 1;
            Ok::<_, ()>("main#2".to_string())
        });

        assert_eq!(first, Ok(("main#1".to_string(), true)));
        assert_eq!(second, Ok(("main#1".to_string(), false)));
        assert_eq!(builds, 1);
    }

    #[test]
    fn window_slot_stays_empty_when_creation_fails() {
        let slot = WindowSlot::<String>::default();

        assert_eq!(slot.get_or_try_create(|| Err("no display")), Err("no display"));
        assert!(slot.get().is_none());
    }

    #[test]
    fn only_primary_destroy_releases_the_slot() {
        let slot = WindowSlot::<String>::default();
        slot.get_or_try_create(|| Ok::<_, ()>("primary".to_string()))
            .expect("empty slot accepts a window");

        assert!(!slot.release_on_destroy("aux-1"));
        assert_eq!(slot.get(), Some("primary".to_string()));

        assert!(slot.release_on_destroy("main"));
        assert!(slot.get().is_none());
    }

    #[test]
    fn greeting_latch_fires_once_on_first_finished_load() {
        let latch = GreetingLatch::default();

        assert!(!latch.should_greet(PageLoadEvent::Started));
        assert!(latch.should_greet(PageLoadEvent::Finished));
        assert!(!latch.should_greet(PageLoadEvent::Started));
        assert!(!latch.should_greet(PageLoadEvent::Finished));
    }

    #[test]
    fn greeting_latches_are_independent_per_window() {
        let first_window = GreetingLatch::default();
        let recreated_window = GreetingLatch::default();

        assert!(first_window.should_greet(PageLoadEvent::Finished));
        assert!(recreated_window.should_greet(PageLoadEvent::Finished));
    }

    #[test]
    fn greeting_timestamp_uses_unpadded_date_and_padded_time() {
        let at = FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 5, 14, 3, 7)
            .unwrap();
        assert_eq!(greeting_timestamp(&at), "2024/1/5 14:03:07");
    }

    #[test]
    fn webview_url_maps_document_locations() {
        let dev = webview_url(DocumentLocation::DevServer(
            Url::parse("http://localhost:5173/#about").unwrap(),
        ));
        assert!(matches!(dev, WebviewUrl::External(url) if url.fragment() == Some("about")));

        let packaged = webview_url(DocumentLocation::Packaged("index.html#about".to_string()));
        assert!(
            matches!(packaged, WebviewUrl::App(path) if path.to_str() == Some("index.html#about"))
        );
    }
}
