//! Metric name and label definitions.
//!
//! Every metric stickler emits is named here so the set of exported series is
//! documented in one place.

/// Sticky reconciliation metrics
pub mod sticky {
    /// Inbound messages counted against a sticky record
    pub const MESSAGES_TRACKED_TOTAL: &str = "stickler_sticky_messages_tracked_total";
    /// Tracked messages whose reconciliation was skipped by the debounce gate
    pub const DEBOUNCED_TOTAL: &str = "stickler_sticky_debounced_total";
    /// Successful reposts
    pub const REPOSTS_TOTAL: &str = "stickler_sticky_reposts_total";
    /// Reposts where both the webhook and the direct path failed
    pub const DISPATCH_FAILURES_TOTAL: &str = "stickler_sticky_dispatch_failures_total";
    /// Webhook sends that failed and fell back to a direct channel post
    pub const WEBHOOK_FALLBACKS_TOTAL: &str = "stickler_sticky_webhook_fallbacks_total";
    /// Previous artifacts removed through the content-match history scan
    pub const HISTORY_SCAN_DELETES_TOTAL: &str = "stickler_sticky_history_scan_deletes_total";
    /// Time spent in one reconciliation that reposted, in seconds
    pub const REPOST_DURATION_SECONDS: &str = "stickler_sticky_repost_duration_seconds";
    /// Number of sticky records
    pub const RECORDS: &str = "stickler_sticky_records";
}

/// Webhook identity sweep metrics
pub mod webhook {
    /// Completed sweeps
    pub const SWEEPS_TOTAL: &str = "stickler_webhook_sweeps_total";
    /// Identities created or replaced
    pub const PROVISIONED_TOTAL: &str = "stickler_webhook_provisioned_total";
    /// Records whose identity could not be verified or provisioned
    pub const FAILURES_TOTAL: &str = "stickler_webhook_failures_total";
}

/// Remote version check metrics
pub mod updates {
    /// Version checks performed (label `outcome`: ok, outdated, error)
    pub const CHECKS_TOTAL: &str = "stickler_update_checks_total";
    /// Duration of a version check including retries, in seconds
    pub const CHECK_DURATION_SECONDS: &str = "stickler_update_check_duration_seconds";
}

/// Common label keys
pub mod labels {
    pub const OUTCOME: &str = "outcome";
    pub const PATH: &str = "path";
}

/// Standard histogram buckets
pub mod buckets {
    /// Platform round-trips: 10ms to 30s
    pub const PLATFORM_DURATION: &[f64] = &[
        0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
    ];
}
