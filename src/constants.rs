// Application-wide constants

/// Keys written into the per-request data store by the bundled middleware.
pub mod data_keys {
    /// Set by `middleware::request_id`, read by the logger and recovery boundary.
    pub const REQUEST_ID: &str = "request_id";
    /// Default key under which the auth middleware stores the `Identity`.
    pub const IDENTITY: &str = "identity";
    /// Set by `middleware::upload::validator` to the validated `Vec<UploadedFile>`.
    pub const UPLOADED_FILES: &str = "uploaded_files";
}

/// Header names
pub mod headers {
    pub const REQUEST_ID: &str = "x-request-id";
    pub const APPLICATION_JSON: &str = "application/json";
}

/// Auth defaults
pub mod auth {
    pub const DEFAULT_COOKIE_NAME: &str = "auth_token";
    pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 24 * 3600; // 1 day
    pub const BEARER_PREFIX: &str = "Bearer ";
}

/// Upload defaults
pub mod upload {
    pub const DEFAULT_FIELD: &str = "file";
    pub const DEFAULT_MAX_MEMORY: u64 = 32 << 20; // 32MB
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 << 20; // 10MB
    /// Bytes inspected when sniffing the content type of an upload.
    pub const SNIFF_LEN: usize = 512;
}

/// Default configuration values
pub mod defaults {
    pub const ADDR: &str = "0.0.0.0:8080";
    pub const MAX_BODY_SIZE: usize = 32 * 1024 * 1024; // 32MB
    pub const LOG_LEVEL: &str = "info";
}

/// Time conversion helpers
pub mod time {
    pub const SECONDS_PER_MINUTE: u64 = 60;
    pub const SECONDS_PER_HOUR: u64 = 3600;
    pub const SECONDS_PER_DAY: u64 = 86_400;
}
