//! Caller deadline propagation
//!
//! tonic surfaces the caller's deadline as the `grpc-timeout` metadata value
//! rather than as a cancellable context, so long-running receive loops parse
//! it once and re-check it before every blocking step. An expired deadline is
//! converted to `DeadlineExceeded` instead of blocking on the next message.

use std::time::{Duration, Instant};

use tonic::metadata::MetadataMap;
use tonic::Status;

/// Absolute deadline derived from the `grpc-timeout` request metadata, if the
/// caller set one.
///
/// Wire format per the gRPC spec: ASCII digits followed by a single unit
/// character (`H`, `M`, `S`, `m`, `u`, `n`).
pub fn from_metadata(metadata: &MetadataMap) -> Option<Instant> {
    let value = metadata.get("grpc-timeout")?.to_str().ok()?;
    if value.len() < 2 {
        return None;
    }

    let (digits, unit) = value.split_at(value.len() - 1);
    let amount: u64 = digits.parse().ok()?;

    let timeout = match unit {
        "H" => Duration::from_secs(amount.checked_mul(3600)?),
        "M" => Duration::from_secs(amount.checked_mul(60)?),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        _ => return None,
    };

    Instant::now().checked_add(timeout)
}

/// Whether the deadline (if any) has already passed.
pub fn expired(deadline: Option<Instant>) -> bool {
    matches!(deadline, Some(d) if Instant::now() >= d)
}

/// Fail fast with `DeadlineExceeded` when the caller's deadline has passed.
pub fn check(deadline: Option<Instant>) -> Result<(), Status> {
    if expired(deadline) {
        Err(Status::deadline_exceeded("call deadline exceeded"))
    } else {
        Ok(())
    }
}
