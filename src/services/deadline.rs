use time::{Duration, PrimitiveDateTime};

/// Deadline of an attempt started at `started_at`. Fixed at creation.
pub(crate) fn compute_expiration(
    started_at: PrimitiveDateTime,
    duration_minutes: i32,
) -> PrimitiveDateTime {
    started_at + Duration::minutes(i64::from(duration_minutes.max(0)))
}

/// An attempt is expired from its deadline onwards, inclusive.
pub(crate) fn is_expired(expires_at: PrimitiveDateTime, now: PrimitiveDateTime) -> bool {
    now >= expires_at
}

pub(crate) fn remaining_seconds(expires_at: PrimitiveDateTime, now: PrimitiveDateTime) -> i64 {
    (expires_at - now).whole_seconds().max(0)
}
