use thiserror::Error;

use crate::{
    app_types::UpdateErrorPayload, CHECK_FAILED_MESSAGE, DOWNLOAD_FAILED_MESSAGE,
    DOWNLOAD_IN_PROGRESS_MESSAGE, INSTALL_FAILED_MESSAGE, NOT_PACKAGED_MESSAGE,
    NO_DOWNLOADED_UPDATE_MESSAGE, NO_PENDING_UPDATE_MESSAGE,
};

/// Failures of a single check, download or install attempt.
///
/// None of these are fatal: the coordinator converts every one of them into an
/// [`UpdateErrorPayload`] and returns to idle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum UpdateError {
    #[error("updates are only available in packaged builds")]
    NotPackaged,
    #[error("update check failed: {0}")]
    CheckFailed(String),
    #[error("update download failed: {0}")]
    DownloadFailed(String),
    #[error("an update download is already in progress")]
    DownloadInProgress,
    #[error("no update is pending; check for updates first")]
    NoPendingUpdate,
    #[error("no downloaded update is ready to install")]
    NoDownloadedUpdate,
    #[error("update install failed: {0}")]
    InstallFailed(String),
}

impl UpdateError {
    pub(crate) fn user_message(&self) -> &'static str {
        match self {
            Self::NotPackaged => NOT_PACKAGED_MESSAGE,
            Self::CheckFailed(_) => CHECK_FAILED_MESSAGE,
            Self::DownloadFailed(_) => DOWNLOAD_FAILED_MESSAGE,
            Self::DownloadInProgress => DOWNLOAD_IN_PROGRESS_MESSAGE,
            Self::NoPendingUpdate => NO_PENDING_UPDATE_MESSAGE,
            Self::NoDownloadedUpdate => NO_DOWNLOADED_UPDATE_MESSAGE,
            Self::InstallFailed(_) => INSTALL_FAILED_MESSAGE,
        }
    }

    pub(crate) fn to_payload(&self) -> UpdateErrorPayload {
        UpdateErrorPayload {
            message: self.user_message().to_string(),
            error: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::UpdateError;

    #[test]
    fn not_packaged_payload_uses_dev_build_message() {
        let payload = UpdateError::NotPackaged.to_payload();
        assert_eq!(payload.message, "更新功能仅在打包后可用");
        assert_eq!(
            payload.error,
            "updates are only available in packaged builds"
        );
    }

    #[test]
    fn check_failed_payload_keeps_engine_detail_in_error() {
        let payload = UpdateError::CheckFailed("dns lookup failed".to_string()).to_payload();
        assert_eq!(payload.message, "网络错误");
        assert_eq!(payload.error, "update check failed: dns lookup failed");
    }

    #[test]
    fn download_failed_payload_keeps_engine_detail_in_error() {
        let payload = UpdateError::DownloadFailed("connection reset".to_string()).to_payload();
        assert_eq!(payload.message, "下载更新失败");
        assert!(payload.error.ends_with("connection reset"));
    }
}
