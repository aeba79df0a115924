use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

/// Result of one update check. Transient, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VersionInfo {
    pub(crate) current_version: String,
    pub(crate) latest_version: Option<String>,
    pub(crate) update_available: bool,
}

/// Point-in-time snapshot of a running download.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProgressInfo {
    pub(crate) bytes_per_second: u64,
    pub(crate) percent: f64,
    pub(crate) transferred: u64,
    pub(crate) total: u64,
}

/// Payload of `update-can-available`, and the success value of `check-update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateAvailability {
    pub(crate) update: bool,
    pub(crate) version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) new_version: Option<String>,
}

impl From<&VersionInfo> for UpdateAvailability {
    fn from(info: &VersionInfo) -> Self {
        Self {
            update: info.update_available,
            version: info.current_version.clone(),
            new_version: info.latest_version.clone(),
        }
    }
}

/// `{message, error}` shape shared by failed commands and `update-error` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct UpdateErrorPayload {
    pub(crate) message: String,
    pub(crate) error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub(crate) enum CheckUpdateResponse {
    Availability(UpdateAvailability),
    Failure(UpdateErrorPayload),
}

pub(crate) struct AtomicFlagGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> AtomicFlagGuard<'a> {
    pub(crate) fn try_set(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self { flag })
    }
}

impl Drop for AtomicFlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use serde_json::json;

    use super::*;

    #[test]
    fn atomic_flag_guard_try_set_rejects_double_set_until_drop() {
        let flag = AtomicBool::new(false);

        let guard = AtomicFlagGuard::try_set(&flag).expect("first set should succeed");
        assert!(flag.load(Ordering::Acquire));
        assert!(AtomicFlagGuard::try_set(&flag).is_none());

        drop(guard);
        assert!(!flag.load(Ordering::Acquire));
        assert!(AtomicFlagGuard::try_set(&flag).is_some());
    }

    #[test]
    fn update_availability_uses_wire_field_names() {
        let info = VersionInfo {
            current_version: "1.0.0".to_string(),
            latest_version: Some("2.0.0".to_string()),
            update_available: true,
        };

        let value = serde_json::to_value(UpdateAvailability::from(&info)).unwrap();
        assert_eq!(
            value,
            json!({ "update": true, "version": "1.0.0", "newVersion": "2.0.0" })
        );
    }

    #[test]
    fn update_availability_omits_absent_new_version() {
        let info = VersionInfo {
            current_version: "1.0.0".to_string(),
            latest_version: None,
            update_available: false,
        };

        let value = serde_json::to_value(UpdateAvailability::from(&info)).unwrap();
        assert_eq!(value, json!({ "update": false, "version": "1.0.0" }));
    }

    #[test]
    fn update_availability_reports_remote_version_when_not_newer() {
        let info = VersionInfo {
            current_version: "1.2.0".to_string(),
            latest_version: Some("1.2.0".to_string()),
            update_available: false,
        };

        let value = serde_json::to_value(UpdateAvailability::from(&info)).unwrap();
        assert_eq!(
            value,
            json!({ "update": false, "version": "1.2.0", "newVersion": "1.2.0" })
        );
    }

    #[test]
    fn progress_info_serializes_camel_case() {
        let progress = ProgressInfo {
            bytes_per_second: 512,
            percent: 50.0,
            transferred: 1024,
            total: 2048,
        };

        let value = serde_json::to_value(progress).unwrap();
        assert_eq!(
            value,
            json!({
                "bytesPerSecond": 512,
                "percent": 50.0,
                "transferred": 1024,
                "total": 2048
            })
        );
    }

    #[test]
    fn check_update_response_failure_is_flat_message_and_error() {
        let response = CheckUpdateResponse::Failure(UpdateErrorPayload {
            message: "网络错误".to_string(),
            error: "connection refused".to_string(),
        });

        let value = serde_json::to_value(response).unwrap();
        assert_eq!(
            value,
            json!({ "message": "网络错误", "error": "connection refused" })
        );
    }
}
