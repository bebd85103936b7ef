//! Control API routes

/// `GET` device identity
pub const INFO: &str = "/api/info";

/// `GET` visible WiFi networks
pub const WIFI_SCAN: &str = "/api/wifi/scan";

/// `POST` WiFi credentials
pub const PROVISION: &str = "/api/provision";

/// `GET` runtime status
pub const STATUS: &str = "/api/status";

/// `POST` free-form message (simulator only)
pub const MESSAGE: &str = "/api/message";
