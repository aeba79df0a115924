use std::env;

use url::Url;

use crate::{DEV_SERVER_URL_ENV, PACKAGED_INDEX_DOCUMENT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Platform {
    MacOs,
    Windows,
    Linux,
    Other,
}

impl Platform {
    pub(crate) fn from_os(os: &str) -> Self {
        match os {
            "macos" => Self::MacOs,
            "windows" => Self::Windows,
            "linux" => Self::Linux,
            _ => Self::Other,
        }
    }

    /// macOS apps stay resident with zero windows until reactivated.
    pub(crate) fn keeps_running_without_windows(self) -> bool {
        self == Self::MacOs
    }

    /// WebView2 paints an opaque background unless it is cleared explicitly.
    pub(crate) fn needs_transparent_background_shim(self) -> bool {
        self == Self::Windows
    }

    fn packaged_origin(self) -> &'static str {
        match self {
            Self::Windows => "http://tauri.localhost/",
            _ => "tauri://localhost/",
        }
    }
}

/// Where a window should load the app document from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DocumentLocation {
    DevServer(Url),
    /// Path relative to the bundled frontend, fragment included.
    Packaged(String),
}

#[derive(Debug, Clone)]
pub(crate) struct ShellConfig {
    pub(crate) dev_server_url: Option<Url>,
    pub(crate) packaged: bool,
    pub(crate) platform: Platform,
}

impl ShellConfig {
    pub(crate) fn from_env() -> Self {
        let raw_dev_url = env::var(DEV_SERVER_URL_ENV).ok();
        Self::from_parts(raw_dev_url.as_deref(), !tauri::is_dev(), env::consts::OS)
    }

    pub(crate) fn from_parts(raw_dev_url: Option<&str>, packaged: bool, os: &str) -> Self {
        Self {
            dev_server_url: raw_dev_url.and_then(parse_dev_server_url),
            packaged,
            platform: Platform::from_os(os),
        }
    }

    pub(crate) fn document_location(&self, fragment: Option<&str>) -> DocumentLocation {
        let fragment = fragment.map(str::trim).filter(|value| !value.is_empty());
        match &self.dev_server_url {
            Some(dev_url) => {
                let mut url = dev_url.clone();
                url.set_fragment(fragment);
                DocumentLocation::DevServer(url)
            }
            None => match fragment {
                Some(fragment) => {
                    DocumentLocation::Packaged(format!("{PACKAGED_INDEX_DOCUMENT}#{fragment}"))
                }
                None => DocumentLocation::Packaged(PACKAGED_INDEX_DOCUMENT.to_string()),
            },
        }
    }

    /// Origin that in-app navigation is allowed to stay on.
    pub(crate) fn app_origin(&self) -> Url {
        if let Some(dev_url) = &self.dev_server_url {
            return dev_url.clone();
        }
        // Safe because both packaged origins are static, well-formed URLs.
        Url::parse(self.platform.packaged_origin()).expect("packaged origin is a valid URL")
    }
}

fn parse_dev_server_url(raw: &str) -> Option<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        Ok(url) => {
            log::warn!(
                "ignoring {DEV_SERVER_URL_ENV} with unsupported scheme '{}'",
                url.scheme()
            );
            None
        }
        Err(error) => {
            log::warn!("ignoring invalid {DEV_SERVER_URL_ENV} '{trimmed}': {error}");
            None
        }
    }
}

/// Switches handed to the update engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UpdateEngineConfig {
    pub(crate) auto_download: bool,
    pub(crate) allow_downgrade: bool,
    pub(crate) web_installer_fallback: bool,
    /// Minisign public key; overrides the empty `pubkey` in `tauri.conf.json`.
    pub(crate) pubkey: Option<&'static str>,
}

impl Default for UpdateEngineConfig {
    fn default() -> Self {
        Self {
            auto_download: false,
            allow_downgrade: false,
            web_installer_fallback: true,
            pubkey: updater_pubkey_from(option_env!("OVERLAY_SHELL_UPDATER_PUBKEY")),
        }
    }
}

fn updater_pubkey_from(raw: Option<&'static str>) -> Option<&'static str> {
    raw.map(str::trim).filter(|key| !key.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_from_os_maps_known_targets() {
        assert_eq!(Platform::from_os("macos"), Platform::MacOs);
        assert_eq!(Platform::from_os("windows"), Platform::Windows);
        assert_eq!(Platform::from_os("linux"), Platform::Linux);
        assert_eq!(Platform::from_os("freebsd"), Platform::Other);
    }

    #[test]
    fn only_macos_keeps_running_without_windows() {
        assert!(Platform::MacOs.keeps_running_without_windows());
        assert!(!Platform::Windows.keeps_running_without_windows());
        assert!(!Platform::Linux.keeps_running_without_windows());
    }

    #[test]
    fn only_windows_needs_transparent_background_shim() {
        assert!(Platform::Windows.needs_transparent_background_shim());
        assert!(!Platform::MacOs.needs_transparent_background_shim());
        assert!(!Platform::Linux.needs_transparent_background_shim());
    }

    #[test]
    fn from_parts_ignores_blank_and_invalid_dev_urls() {
        assert!(ShellConfig::from_parts(Some("   "), false, "linux")
            .dev_server_url
            .is_none());
        assert!(ShellConfig::from_parts(Some("not a url"), false, "linux")
            .dev_server_url
            .is_none());
        assert!(ShellConfig::from_parts(Some("file:///tmp/index.html"), false, "linux")
            .dev_server_url
            .is_none());
    }

    #[test]
    fn document_location_uses_dev_server_when_present() {
        let config = ShellConfig::from_parts(Some("http://localhost:5173/"), false, "linux");

        assert_eq!(
            config.document_location(None),
            DocumentLocation::DevServer(Url::parse("http://localhost:5173/").unwrap())
        );
        assert_eq!(
            config.document_location(Some("settings")),
            DocumentLocation::DevServer(Url::parse("http://localhost:5173/#settings").unwrap())
        );
    }

    #[test]
    fn document_location_uses_packaged_index_without_dev_server() {
        let config = ShellConfig::from_parts(None, true, "windows");

        assert_eq!(
            config.document_location(None),
            DocumentLocation::Packaged("index.html".to_string())
        );
        assert_eq!(
            config.document_location(Some("about")),
            DocumentLocation::Packaged("index.html#about".to_string())
        );
        assert_eq!(
            config.document_location(Some("  ")),
            DocumentLocation::Packaged("index.html".to_string())
        );
    }

    #[test]
    fn app_origin_follows_platform_custom_protocol() {
        let windows = ShellConfig::from_parts(None, true, "windows");
        let macos = ShellConfig::from_parts(None, true, "macos");

        assert_eq!(windows.app_origin().as_str(), "http://tauri.localhost/");
        assert_eq!(macos.app_origin().as_str(), "tauri://localhost/");
    }

    #[test]
    fn update_engine_config_defaults_disable_auto_download_and_downgrade() {
        let config = UpdateEngineConfig::default();
        assert!(!config.auto_download);
        assert!(!config.allow_downgrade);
        assert!(config.web_installer_fallback);
    }

    #[test]
    fn updater_pubkey_ignores_blank_build_values() {
        assert_eq!(updater_pubkey_from(None), None);
        assert_eq!(updater_pubkey_from(Some("")), None);
        assert_eq!(updater_pubkey_from(Some("  \n")), None);
        assert_eq!(
            updater_pubkey_from(Some(" dW50cnVzdGVkIGNvbW1lbnQ= ")),
            Some("dW50cnVzdGVkIGNvbW1lbnQ=")
        );
    }
}
