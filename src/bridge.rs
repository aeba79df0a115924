use serde::Serialize;
use tauri::{AppHandle, Emitter};
use thiserror::Error;

use crate::app_types::{ProgressInfo, UpdateAvailability, UpdateErrorPayload};

pub(crate) const CHANNEL_OPEN_WIN: &str = "open-win";
pub(crate) const CHANNEL_CHECK_UPDATE: &str = "check-update";
pub(crate) const CHANNEL_START_DOWNLOAD: &str = "start-download";
pub(crate) const CHANNEL_QUIT_AND_INSTALL: &str = "quit-and-install";

pub(crate) const EVENT_UPDATE_CAN_AVAILABLE: &str = "update-can-available";
pub(crate) const EVENT_DOWNLOAD_PROGRESS: &str = "download-progress";
pub(crate) const EVENT_UPDATE_DOWNLOADED: &str = "update-downloaded";
pub(crate) const EVENT_UPDATE_ERROR: &str = "update-error";
pub(crate) const EVENT_MAIN_PROCESS_MESSAGE: &str = "main-process-message";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum BridgeError {
    #[error("unknown bridge channel '{0}'")]
    UnknownChannel(String),
    #[error("bridge channel '{0}' requires an argument")]
    MissingArgument(&'static str),
}

/// Commands the UI may invoke on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BridgeCommand {
    OpenWindow { fragment: String },
    CheckUpdate,
    StartDownload,
    QuitAndInstall,
}

impl BridgeCommand {
    pub(crate) fn parse(channel: &str, arg: Option<String>) -> Result<Self, BridgeError> {
        match channel {
            CHANNEL_OPEN_WIN => arg
                .map(|fragment| Self::OpenWindow { fragment })
                .ok_or(BridgeError::MissingArgument(CHANNEL_OPEN_WIN)),
            CHANNEL_CHECK_UPDATE => Ok(Self::CheckUpdate),
            CHANNEL_START_DOWNLOAD => Ok(Self::StartDownload),
            CHANNEL_QUIT_AND_INSTALL => Ok(Self::QuitAndInstall),
            other => Err(BridgeError::UnknownChannel(other.to_string())),
        }
    }

    pub(crate) fn channel(&self) -> &'static str {
        match self {
            Self::OpenWindow { .. } => CHANNEL_OPEN_WIN,
            Self::CheckUpdate => CHANNEL_CHECK_UPDATE,
            Self::StartDownload => CHANNEL_START_DOWNLOAD,
            Self::QuitAndInstall => CHANNEL_QUIT_AND_INSTALL,
        }
    }
}

/// Notifications pushed from the host to a webview.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BridgeEvent {
    UpdateCanAvailable(UpdateAvailability),
    DownloadProgress(ProgressInfo),
    UpdateDownloaded,
    UpdateError(UpdateErrorPayload),
    MainProcessMessage(String),
}

impl BridgeEvent {
    pub(crate) fn channel(&self) -> &'static str {
        match self {
            Self::UpdateCanAvailable(_) => EVENT_UPDATE_CAN_AVAILABLE,
            Self::DownloadProgress(_) => EVENT_DOWNLOAD_PROGRESS,
            Self::UpdateDownloaded => EVENT_UPDATE_DOWNLOADED,
            Self::UpdateError(_) => EVENT_UPDATE_ERROR,
            Self::MainProcessMessage(_) => EVENT_MAIN_PROCESS_MESSAGE,
        }
    }
}

pub(crate) trait EventSink: Send + Sync {
    fn emit(&self, event: BridgeEvent);
}

/// Delivers events to a single webview, identified by its label.
#[derive(Clone)]
pub(crate) struct WebviewEventSink {
    app_handle: AppHandle,
    label: String,
}

impl WebviewEventSink {
    pub(crate) fn new(app_handle: AppHandle, label: impl Into<String>) -> Self {
        Self {
            app_handle,
            label: label.into(),
        }
    }

    fn emit_payload<S>(&self, channel: &str, payload: S)
    where
        S: Serialize + Clone,
    {
        if let Err(error) = self
            .app_handle
            .emit_to(self.label.as_str(), channel, payload)
        {
            log::warn!(
                "failed to emit {channel} to webview {}: {error}",
                self.label
            );
        }
    }
}

impl EventSink for WebviewEventSink {
    fn emit(&self, event: BridgeEvent) {
        let channel = event.channel();
        match event {
            BridgeEvent::UpdateCanAvailable(payload) => self.emit_payload(channel, payload),
            BridgeEvent::DownloadProgress(payload) => self.emit_payload(channel, payload),
            BridgeEvent::UpdateDownloaded => self.emit_payload(channel, ()),
            BridgeEvent::UpdateError(payload) => self.emit_payload(channel, payload),
            BridgeEvent::MainProcessMessage(payload) => self.emit_payload(channel, payload),
        }
    }
}
