// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Per provider call timeout when none is configured (5 minutes)
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 300;
/// Retryable provider errors are not retried unless configured
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 0;
/// Base delay between retries; attempt `n` waits `n` times this
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 200;
/// Concurrency limit used when available parallelism cannot be determined
pub const FALLBACK_MAX_CONCURRENCY: usize = 4;
/// Account id used in ARNs minted by the in-memory provider
pub const DEFAULT_ACCOUNT_ID: &str = "000000000000";
/// Region used when a declaration file does not name one
pub const DEFAULT_REGION: &str = "ap-northeast-1";
