//! Default values applied by `Settings::default()` and by settings
//! normalization.

// default breaker settings
pub const DEFAULT_BREAKER_NAME: &str = "default";
pub const DEFAULT_CONSECUTIVE_FAILURE_THRESHOLD: u64 = 5;
pub const DEFAULT_SUCCESS_THRESHOLD: u64 = 1;
pub const DEFAULT_OPEN_TIMEOUT_MS: u64 = 60_000;

// default rolling window settings
pub const DEFAULT_ROLLING_WINDOW_MS: u64 = 10_000;
pub const DEFAULT_WINDOW_BUCKET_COUNT: u32 = 10;
// the bucket length can never shrink below this, whatever the bucket count
pub const MIN_BUCKET_LEN_MS: u64 = 1;
pub const DEFAULT_MINIMUM_REQUEST_VOLUME: u64 = 3;

// default log settings
pub const DEFAULT_LOG_LEVEL: &str = "warn";
