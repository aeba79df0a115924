use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NavigationDecision {
    Allow,
    OpenExternal,
    Deny,
}

/// Decides what happens when the primary webview tries to navigate.
///
/// Only the app document's own origin may load in place. Secure external links
/// go to the system browser; everything else is dropped.
pub(crate) fn decide(target: &Url, app_origin: &Url) -> NavigationDecision {
    if is_same_origin(target, app_origin) {
        return NavigationDecision::Allow;
    }
    if target.scheme() == "https" {
        return NavigationDecision::OpenExternal;
    }
    NavigationDecision::Deny
}

/// Popups (`window.open`, `target="_blank"`) never get a window of their own.
/// Secure external targets still reach the system browser.
pub(crate) fn decide_new_window(target: &Url, app_origin: &Url) -> NavigationDecision {
    match decide(target, app_origin) {
        NavigationDecision::OpenExternal => NavigationDecision::OpenExternal,
        NavigationDecision::Allow | NavigationDecision::Deny => NavigationDecision::Deny,
    }
}

// `Url::origin` is opaque for custom schemes such as `tauri://`, so compare the
// parts directly.
fn is_same_origin(left: &Url, right: &Url) -> bool {
    left.scheme() == right.scheme()
        && left.host_str() == right.host_str()
        && left.port_or_known_default() == right.port_or_known_default()
}
