// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! All runtime environment variables used by mcphub are defined here. Use
//! these accessors instead of calling `std::env::var()` directly.

use std::path::PathBuf;

/// `MCPHUB_CACHE_DIR` — cache directory override.
pub const MCPHUB_CACHE_DIR: &str = "MCPHUB_CACHE_DIR";

/// `MCPHUB_ENGINE` — container engine binary override.
pub const MCPHUB_ENGINE: &str = "MCPHUB_ENGINE";

/// `MCPHUB_INIT_TIMEOUT_MS` — initialize handshake deadline.
pub const MCPHUB_INIT_TIMEOUT_MS: &str = "MCPHUB_INIT_TIMEOUT_MS";

/// `MCPHUB_LIST_TIMEOUT_MS` — discovery call deadline.
pub const MCPHUB_LIST_TIMEOUT_MS: &str = "MCPHUB_LIST_TIMEOUT_MS";

/// `MCPHUB_CALL_TIMEOUT_MS` — tool call deadline.
pub const MCPHUB_CALL_TIMEOUT_MS: &str = "MCPHUB_CALL_TIMEOUT_MS";

/// `MCPHUB_TEARDOWN_GRACE_MS` — grace period before force-terminating a child.
pub const MCPHUB_TEARDOWN_GRACE_MS: &str = "MCPHUB_TEARDOWN_GRACE_MS";

/// `MCPHUB_REFRESH_WAKE_HOURS` — scheduler wake interval.
pub const MCPHUB_REFRESH_WAKE_HOURS: &str = "MCPHUB_REFRESH_WAKE_HOURS";

/// `MCPHUB_REFRESH_MIN_HOURS` — per-source minimum refresh interval.
pub const MCPHUB_REFRESH_MIN_HOURS: &str = "MCPHUB_REFRESH_MIN_HOURS";

/// `MCPHUB_ON_TRANSPORT_CLOSED` — dead-transport policy (`surface` or `unmount`).
pub const MCPHUB_ON_TRANSPORT_CLOSED: &str = "MCPHUB_ON_TRANSPORT_CLOSED";

/// `MCPHUB_CACHE_DIR` as a path.
pub fn cache_dir() -> Option<PathBuf> {
    std::env::var(MCPHUB_CACHE_DIR).ok().map(PathBuf::from)
}

/// `MCPHUB_ENGINE` value.
pub fn engine() -> Option<String> {
    std::env::var(MCPHUB_ENGINE).ok()
}

/// `MCPHUB_INIT_TIMEOUT_MS` value.
pub fn init_timeout_ms() -> Option<u64> {
    var_u64(MCPHUB_INIT_TIMEOUT_MS)
}

/// `MCPHUB_LIST_TIMEOUT_MS` value.
pub fn list_timeout_ms() -> Option<u64> {
    var_u64(MCPHUB_LIST_TIMEOUT_MS)
}

/// `MCPHUB_CALL_TIMEOUT_MS` value.
pub fn call_timeout_ms() -> Option<u64> {
    var_u64(MCPHUB_CALL_TIMEOUT_MS)
}

/// `MCPHUB_TEARDOWN_GRACE_MS` value.
pub fn teardown_grace_ms() -> Option<u64> {
    var_u64(MCPHUB_TEARDOWN_GRACE_MS)
}

/// `MCPHUB_REFRESH_WAKE_HOURS` value.
pub fn refresh_wake_hours() -> Option<u64> {
    var_u64(MCPHUB_REFRESH_WAKE_HOURS)
}

/// `MCPHUB_REFRESH_MIN_HOURS` value.
pub fn refresh_min_hours() -> Option<u64> {
    var_u64(MCPHUB_REFRESH_MIN_HOURS)
}

/// `MCPHUB_ON_TRANSPORT_CLOSED` value.
pub fn on_transport_closed() -> Option<String> {
    std::env::var(MCPHUB_ON_TRANSPORT_CLOSED).ok()
}

fn var_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
