//! Centralized default constants for SpaceNote.
//!
//! **This module is the single source of truth** for shared default values.
//! The client, the CLI and the form machinery reference these constants
//! instead of defining their own magic numbers.

// =============================================================================
// API
// =============================================================================

/// Default backend base URL.
pub const API_URL: &str = "http://127.0.0.1:3100";

/// Path prefix of every REST endpoint.
pub const API_PREFIX: &str = "api/v1";

/// Timeout for a single HTTP request in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// READ QUERY RETRY
// =============================================================================

/// Maximum automatic retries for a failed read query.
pub const QUERY_MAX_RETRIES: u32 = 3;

/// Base delay of the read retry backoff in milliseconds.
pub const QUERY_RETRY_BASE_MS: u64 = 1000;

/// Upper bound of the read retry backoff in milliseconds.
pub const QUERY_RETRY_MAX_MS: u64 = 10_000;

// =============================================================================
// IMAGE POLLING
// =============================================================================

/// First delay after the server answers 202 for an image variant.
pub const IMAGE_POLL_INITIAL_MS: u64 = 1000;

/// Upper bound of the image poll delay.
pub const IMAGE_POLL_MAX_MS: u64 = 10_000;

/// Growth factor of the image poll delay.
pub const IMAGE_POLL_FACTOR: f64 = 1.5;

/// Number of 202 answers tolerated before giving up.
pub const IMAGE_POLL_MAX_RETRIES: u32 = 10;

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for note listings.
pub const NOTES_PAGE_LIMIT: u32 = 50;

/// First page number (the API is 1-based).
pub const NOTES_FIRST_PAGE: u32 = 1;

// =============================================================================
// QUERY CACHE
// =============================================================================

/// Distinct query keys kept before the least recently used is evicted.
pub const QUERY_CACHE_CAPACITY: usize = 256;

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Capacity of the notification broadcast channel.
pub const NOTIFICATION_CAPACITY: usize = 64;

// =============================================================================
// QUERY GRAMMAR
// =============================================================================

/// Separator between conditions in a `q` string.
pub const CONDITION_SEPARATOR: char = ',';

/// Separator between field, operator and value inside a condition.
pub const TOKEN_SEPARATOR: char = ':';

/// Separator between items of a list value (`in`, `nin`, `all`).
pub const LIST_VALUE_SEPARATOR: char = '|';
