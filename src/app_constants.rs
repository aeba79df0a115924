pub(crate) const MAIN_WINDOW_LABEL: &str = "main";
pub(crate) const MAIN_WINDOW_TITLE: &str = "Main window";
pub(crate) const SECONDARY_WINDOW_LABEL_PREFIX: &str = "aux-";

pub(crate) const DEV_SERVER_URL_ENV: &str = "VITE_DEV_SERVER_URL";
pub(crate) const PACKAGED_INDEX_DOCUMENT: &str = "index.html";

// Used when the primary display cannot be queried.
pub(crate) const FALLBACK_WINDOW_WIDTH: f64 = 1280.0;
pub(crate) const FALLBACK_WINDOW_HEIGHT: f64 = 800.0;

pub(crate) const NOT_PACKAGED_MESSAGE: &str = "更新功能仅在打包后可用";
pub(crate) const CHECK_FAILED_MESSAGE: &str = "网络错误";
pub(crate) const DOWNLOAD_FAILED_MESSAGE: &str = "下载更新失败";
pub(crate) const DOWNLOAD_IN_PROGRESS_MESSAGE: &str = "更新正在下载中";
pub(crate) const NO_PENDING_UPDATE_MESSAGE: &str = "没有可下载的更新，请先检查更新";
pub(crate) const NO_DOWNLOADED_UPDATE_MESSAGE: &str = "更新尚未下载完成";
pub(crate) const INSTALL_FAILED_MESSAGE: &str = "安装更新失败";
