// fc-core/src/time.rs
// ============================================================================
// Module: FailCore Time Model
// Description: Canonical ISO-8601 timestamp representation for trace records.
// Purpose: Provide a single timestamp type shared by traces, decisions, and drift.
// Dependencies: time, serde
// ============================================================================

//! ## Overview
//! FailCore stamps every trace event with an ISO-8601 timestamp carrying an
//! explicit offset. The runtime never reads wall-clock time inside
//! deterministic engines (validation, semantic guard, drift); callers pass
//! a [`Timestamp`] in explicitly so replay and tests stay reproducible.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// A point in time, always carrying an explicit UTC offset.
///
/// # Invariants
/// - Serializes as an RFC 3339 / ISO-8601 string with timezone, matching
///   the trace file format's `ts` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(#[serde(with = "time::serde::rfc3339")] OffsetDateTime);

impl Timestamp {
    /// Wraps an [`OffsetDateTime`] as a [`Timestamp`].
    #[must_use]
    pub const fn from_offset(value: OffsetDateTime) -> Self {
        Self(value)
    }

    /// Returns the current wall-clock time.
    ///
    /// Callers in deterministic engines must not call this; it exists for
    /// entry points (run context creation, proxy request handling) that
    /// legitimately need wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Returns the underlying [`OffsetDateTime`].
    #[must_use]
    pub const fn as_offset(&self) -> OffsetDateTime {
        self.0
    }

    /// Formats the timestamp as RFC 3339 text.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying formatter fails, which only
    /// happens for out-of-range dates that cannot occur from `now()`.
    pub fn to_rfc3339(&self) -> Result<String, time::error::Format> {
        self.0.format(&Rfc3339)
    }

    /// Returns the duration elapsed between `self` and `later`, or zero if
    /// `later` precedes `self`.
    #[must_use]
    pub fn elapsed_until(&self, later: Self) -> time::Duration {
        let delta = later.0 - self.0;
        if delta.is_negative() { time::Duration::ZERO } else { delta }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions are permitted."
)]
mod tests {
    use super::Timestamp;

    #[test]
    fn round_trips_through_json() {
        let ts = Timestamp::now();
        let json = serde_json::to_string(&ts).unwrap();
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, back);
    }

    #[test]
    fn elapsed_until_never_negative() {
        let a = Timestamp::now();
        let b = Timestamp::now();
        let _ = b.elapsed_until(a);
    }
}
