use std::sync::{atomic::AtomicBool, Mutex};

use crate::{
    app_types::{AtomicFlagGuard, CheckUpdateResponse, UpdateAvailability, VersionInfo},
    bridge::{BridgeEvent, EventSink},
    download_progress::ProgressTracker,
    update_engine::{InstallOptions, TauriUpdateEngine, UpdateEngine},
    update_error::UpdateError,
};

const QUIT_AND_INSTALL_OPTIONS: InstallOptions = InstallOptions {
    silent: false,
    force_run_after: true,
};

pub(crate) type ShellUpdateCoordinator = UpdateCoordinator<TauriUpdateEngine>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CheckPhase {
    Idle,
    Checking,
    UpdateAvailable,
    NoUpdate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DownloadPhase {
    Idle,
    Downloading,
    Downloaded,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CoordinatorStatus {
    pub(crate) check: CheckPhase,
    pub(crate) download: DownloadPhase,
    pub(crate) last_check: Option<VersionInfo>,
}

/// Drives the check -> download -> install sequence and republishes engine
/// results as bridge events.
///
/// The check and download machines are independent. Terminal phases are
/// recorded for logging and then fall back to `Idle`. At most one download is
/// in flight; a second `start_download` is rejected with an `update-error`.
pub(crate) struct UpdateCoordinator<E> {
    engine: E,
    packaged: bool,
    check_phase: Mutex<CheckPhase>,
    download_phase: Mutex<DownloadPhase>,
    last_check: Mutex<Option<VersionInfo>>,
    download_in_flight: AtomicBool,
}

impl<E: UpdateEngine> UpdateCoordinator<E> {
    pub(crate) fn new(engine: E, packaged: bool) -> Self {
        Self {
            engine,
            packaged,
            check_phase: Mutex::new(CheckPhase::Idle),
            download_phase: Mutex::new(DownloadPhase::Idle),
            last_check: Mutex::new(None),
            download_in_flight: AtomicBool::new(false),
        }
    }

    pub(crate) fn status(&self) -> CoordinatorStatus {
        CoordinatorStatus {
            check: read_phase(&self.check_phase, CheckPhase::Idle),
            download: read_phase(&self.download_phase, DownloadPhase::Idle),
            last_check: self.last_check.lock().ok().and_then(|guard| guard.clone()),
        }
    }

    pub(crate) async fn check_update<S>(&self, sink: &S) -> CheckUpdateResponse
    where
        S: EventSink + ?Sized,
    {
        if !self.packaged {
            log::info!("check-update skipped: not a packaged build");
            return CheckUpdateResponse::Failure(UpdateError::NotPackaged.to_payload());
        }

        self.set_check_phase(CheckPhase::Checking);
        match self.engine.check_for_updates().await {
            Ok(info) => {
                let availability = UpdateAvailability::from(&info);
                self.set_check_phase(if info.update_available {
                    CheckPhase::UpdateAvailable
                } else {
                    CheckPhase::NoUpdate
                });
                if let Ok(mut guard) = self.last_check.lock() {
                    *guard = Some(info);
                }
                sink.emit(BridgeEvent::UpdateCanAvailable(availability.clone()));
                self.set_check_phase(CheckPhase::Idle);
                CheckUpdateResponse::Availability(availability)
            }
            Err(error) => {
                log::warn!("check-update failed: {error}");
                self.set_check_phase(CheckPhase::Idle);
                CheckUpdateResponse::Failure(error.to_payload())
            }
        }
    }

    /// Runs one download session to completion. Resolves once the terminal
    /// event has been emitted.
    pub(crate) async fn start_download<S>(&self, sink: &S)
    where
        S: EventSink + ?Sized,
    {
        let Some(_in_flight) = AtomicFlagGuard::try_set(&self.download_in_flight) else {
            log::warn!("start-download rejected: a download is already in flight");
            sink.emit(BridgeEvent::UpdateError(
                UpdateError::DownloadInProgress.to_payload(),
            ));
            return;
        };

        self.set_download_phase(DownloadPhase::Downloading);
        let mut tracker = ProgressTracker::start();
        let result = self
            .engine
            .download_update(|chunk_len, content_length| {
                let progress = tracker.record(chunk_len, content_length);
                sink.emit(BridgeEvent::DownloadProgress(progress));
            })
            .await;

        match result {
            Ok(()) => {
                self.set_download_phase(DownloadPhase::Downloaded);
                sink.emit(BridgeEvent::UpdateDownloaded);
            }
            Err(error) => {
                log::warn!("start-download failed: {error}");
                self.set_download_phase(DownloadPhase::Errored);
                sink.emit(BridgeEvent::UpdateError(error.to_payload()));
            }
        }
        self.set_download_phase(DownloadPhase::Idle);
    }

    pub(crate) fn quit_and_install<S>(&self, sink: &S)
    where
        S: EventSink + ?Sized,
    {
        if let Err(error) = self.engine.apply_and_restart(QUIT_AND_INSTALL_OPTIONS) {
            log::warn!("quit-and-install failed: {error}");
            sink.emit(BridgeEvent::UpdateError(error.to_payload()));
        }
    }

    fn set_check_phase(&self, next: CheckPhase) {
        transition(&self.check_phase, next, "check");
    }

    fn set_download_phase(&self, next: DownloadPhase) {
        transition(&self.download_phase, next, "download");
    }
}

fn read_phase<P: Copy>(slot: &Mutex<P>, fallback: P) -> P {
    slot.lock().map(|guard| *guard).unwrap_or(fallback)
}

fn transition<P>(slot: &Mutex<P>, next: P, machine: &str)
where
    P: Copy + PartialEq + std::fmt::Debug,
{
    match slot.lock() {
        Ok(mut guard) => {
            if *guard != next {
                log::debug!("update {machine} phase: {:?} -> {:?}", *guard, next);
                *guard = next;
            }
        }
        Err(error) => log::error!("update {machine} phase lock poisoned: {error}"),
    }
}
