use std::{
    future::Future,
    sync::{Arc, Mutex},
};

use semver::Version;
use tauri::AppHandle;
use tauri_plugin_updater::{Update, Updater, UpdaterExt};

use crate::{app_types::VersionInfo, shell_config::UpdateEngineConfig, update_error::UpdateError};

/// `plugins.updater.windows.installMode` in `tauri.conf.json`. The installer UI
/// stays visible, matching non-silent installs.
pub(crate) const CONFIGURED_WINDOWS_INSTALL_MODE: &str = "basicUi";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InstallOptions {
    pub(crate) silent: bool,
    pub(crate) force_run_after: bool,
}

/// Version lookup, artifact download and self-replacement.
pub(crate) trait UpdateEngine: Send + Sync {
    fn check_for_updates(&self) -> impl Future<Output = Result<VersionInfo, UpdateError>> + Send;

    /// Downloads the update found by the last successful check. `on_chunk`
    /// receives each chunk length and the content length when known.
    fn download_update<F>(&self, on_chunk: F) -> impl Future<Output = Result<(), UpdateError>> + Send
    where
        F: FnMut(usize, Option<u64>) + Send;

    /// Installs the downloaded update. Does not return on success when
    /// `force_run_after` is set.
    fn apply_and_restart(&self, options: InstallOptions) -> Result<(), UpdateError>;
}

pub(crate) fn is_acceptable_release(current: &Version, remote: &Version, allow_downgrade: bool) -> bool {
    if allow_downgrade {
        remote != current
    } else {
        remote > current
    }
}

/// Remote version the comparator saw during one check, accepted or not.
#[derive(Debug, Clone, Default)]
pub(crate) struct SeenRelease(Arc<Mutex<Option<String>>>);

impl SeenRelease {
    pub(crate) fn record(&self, version: &Version) {
        if let Ok(mut guard) = self.0.lock() {
            *guard = Some(version.to_string());
        }
    }

    pub(crate) fn take(&self) -> Option<String> {
        self.0.lock().ok().and_then(|mut guard| guard.take())
    }
}

struct DownloadedUpdate {
    update: Update,
    bytes: Vec<u8>,
}

pub(crate) struct TauriUpdateEngine {
    app_handle: AppHandle,
    config: UpdateEngineConfig,
    pending: Mutex<Option<Update>>,
    downloaded: Mutex<Option<DownloadedUpdate>>,
}

impl TauriUpdateEngine {
    pub(crate) fn new(app_handle: AppHandle, config: UpdateEngineConfig) -> Self {
        log::info!(
            "update engine configured: auto_download={} allow_downgrade={} web_installer_fallback={}",
            config.auto_download,
            config.allow_downgrade,
            config.web_installer_fallback
        );
        if config.pubkey.is_none() {
            log::warn!(
                "no updater public key compiled in; downloads will fail signature verification"
            );
        }
        Self {
            app_handle,
            config,
            pending: Mutex::new(None),
            downloaded: Mutex::new(None),
        }
    }

    fn build_updater(&self) -> Result<(Updater, SeenRelease), UpdateError> {
        let allow_downgrade = self.config.allow_downgrade;
        let seen = SeenRelease::default();
        let seen_by_comparator = seen.clone();

        let mut builder = self
            .app_handle
            .updater_builder()
            .version_comparator(move |current, release| {
                seen_by_comparator.record(&release.version);
                is_acceptable_release(&current, &release.version, allow_downgrade)
            });
        if let Some(pubkey) = self.config.pubkey {
            builder = builder.pubkey(pubkey);
        }

        let updater = builder.build().map_err(|error| {
            UpdateError::CheckFailed(format!("failed to initialize updater: {error}"))
        })?;
        Ok((updater, seen))
    }

    fn current_version(&self) -> String {
        self.app_handle.package_info().version.to_string()
    }

    fn set_pending(&self, update: Option<Update>) {
        match self.pending.lock() {
            Ok(mut guard) => *guard = update,
            Err(error) => log::error!("update engine pending slot poisoned: {error}"),
        }
    }

    fn take_pending(&self) -> Option<Update> {
        self.pending.lock().ok().and_then(|mut guard| guard.take())
    }

    fn set_downloaded(&self, downloaded: Option<DownloadedUpdate>) {
        match self.downloaded.lock() {
            Ok(mut guard) => *guard = downloaded,
            Err(error) => log::error!("update engine downloaded slot poisoned: {error}"),
        }
    }

    fn take_downloaded(&self) -> Option<DownloadedUpdate> {
        self.downloaded.lock().ok().and_then(|mut guard| guard.take())
    }
}

impl UpdateEngine for TauriUpdateEngine {
    async fn check_for_updates(&self) -> Result<VersionInfo, UpdateError> {
        let (updater, seen) = self.build_updater()?;
        let current_version = self.current_version();

        match updater.check().await {
            Ok(Some(update)) => {
                let latest_version = update.version.clone();
                self.set_pending(Some(update));
                Ok(VersionInfo {
                    current_version,
                    latest_version: Some(latest_version),
                    update_available: true,
                })
            }
            Ok(None) => {
                self.set_pending(None);
                Ok(VersionInfo {
                    current_version,
                    latest_version: seen.take(),
                    update_available: false,
                })
            }
            Err(error) => Err(UpdateError::CheckFailed(error.to_string())),
        }
    }

    async fn download_update<F>(&self, mut on_chunk: F) -> Result<(), UpdateError>
    where
        F: FnMut(usize, Option<u64>) + Send,
    {
        let update = self.take_pending().ok_or(UpdateError::NoPendingUpdate)?;

        match update
            .download(|chunk_len, content_length| on_chunk(chunk_len, content_length), || {})
            .await
        {
            Ok(bytes) => {
                log::info!(
                    "update {} downloaded ({} bytes)",
                    update.version,
                    bytes.len()
                );
                self.set_downloaded(Some(DownloadedUpdate { update, bytes }));
                Ok(())
            }
            Err(error) => {
                // Keep the release so a retry does not need a fresh check.
                self.set_pending(Some(update));
                Err(UpdateError::DownloadFailed(error.to_string()))
            }
        }
    }

    fn apply_and_restart(&self, options: InstallOptions) -> Result<(), UpdateError> {
        let DownloadedUpdate { update, bytes } =
            self.take_downloaded().ok_or(UpdateError::NoDownloadedUpdate)?;

        log::info!(
            "installing update {} (silent={} force_run_after={})",
            update.version,
            options.silent,
            options.force_run_after
        );
        if options.silent {
            log::warn!(
                "silent install requested; Windows installer runs in '{CONFIGURED_WINDOWS_INSTALL_MODE}' mode"
            );
        }
        if let Err(error) = update.install(&bytes) {
            let detail = error.to_string();
            self.set_downloaded(Some(DownloadedUpdate { update, bytes }));
            return Err(UpdateError::InstallFailed(detail));
        }

        if options.force_run_after {
            log::info!("update installed; restarting");
            self.app_handle.restart();
        }

        log::info!("update installed; exiting without relaunch");
        self.app_handle.exit(0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use semver::Version;

    use super::{is_acceptable_release, SeenRelease, CONFIGURED_WINDOWS_INSTALL_MODE};

    fn version(raw: &str) -> Version {
        Version::parse(raw).unwrap()
    }

    #[test]
    fn newer_release_is_acceptable() {
        assert!(is_acceptable_release(
            &version("1.0.0"),
            &version("2.0.0"),
            false
        ));
    }

    #[test]
    fn equal_or_older_release_is_rejected_without_downgrade() {
        assert!(!is_acceptable_release(
            &version("1.0.0"),
            &version("1.0.0"),
            false
        ));
        assert!(!is_acceptable_release(
            &version("2.0.0"),
            &version("1.9.9"),
            false
        ));
    }

    #[test]
    fn older_release_is_acceptable_when_downgrade_allowed() {
        assert!(is_acceptable_release(
            &version("2.0.0"),
            &version("1.9.9"),
            true
        ));
        assert!(!is_acceptable_release(
            &version("2.0.0"),
            &version("2.0.0"),
            true
        ));
    }

    #[test]
    fn prerelease_orders_before_release() {
        assert!(is_acceptable_release(
            &version("1.0.0-beta.1"),
            &version("1.0.0"),
            false
        ));
    }

    #[test]
    fn seen_release_reports_rejected_remote_version_once() {
        let seen = SeenRelease::default();
        let comparator_copy = seen.clone();

        comparator_copy.record(&version("1.0.0"));

        assert_eq!(seen.take().as_deref(), Some("1.0.0"));
        assert_eq!(seen.take(), None);
    }

    #[test]
    fn seen_release_is_empty_when_comparator_never_ran() {
        assert_eq!(SeenRelease::default().take(), None);
    }

    #[test]
    fn bundled_config_keeps_windows_installer_visible() {
        let config: serde_json::Value =
            serde_json::from_str(include_str!("../tauri.conf.json")).unwrap();

        assert_eq!(
            config["plugins"]["updater"]["windows"]["installMode"],
            CONFIGURED_WINDOWS_INSTALL_MODE
        );
        assert_ne!(CONFIGURED_WINDOWS_INSTALL_MODE, "quiet");
        assert_ne!(CONFIGURED_WINDOWS_INSTALL_MODE, "passive");
    }
}
