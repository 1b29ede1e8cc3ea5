//! Bounded-array wire framing discipline (spec.md §6 / §7 "ResourceCap").
//!
//! Host transports hand the core raw, host-decoded arrays (collateral
//! lists, batch requests) whose declared length can exceed the core's
//! documented cap. spec.md requires that an oversized array still be fully
//! drained from the transport before the handler returns its
//! `ResourceCap` rejection, so a malformed or hostile payload can never
//! desynchronize the stream for the next request.
//!
//! Grounded on the teacher's `database.rs` row-buffer read pattern (always
//! consume the full declared row width even when a column fails to parse),
//! generalized here to the bounded-array case.

use crate::error::CoreError;

/// Validates a host-supplied array length against this field's documented
/// cap, returning `Ok(())` only when `len <= cap`. The caller must have
/// already drained all `len` elements from the transport before calling
/// this — this function does not touch the transport itself, it only
/// renders the verdict (spec.md §7 "always fully drained").
pub fn check_cap(field: &str, len: usize, cap: usize) -> Result<(), CoreError> {
    if len > cap {
        Err(CoreError::ResourceCap(format!("{field} has {len} entries, cap is {cap}")))
    } else {
        Ok(())
    }
}

/// Truncates (never reorders) a collection to its documented cap, logging
/// the excess via the returned count rather than silently discarding it
/// (spec.md §7 "never silently drop without reporting").
pub fn take_within_cap<T>(mut items: Vec<T>, cap: usize) -> (Vec<T>, usize) {
    if items.len() <= cap {
        (items, 0)
    } else {
        let dropped = items.len() - cap;
        items.truncate(cap);
        (items, dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_check_passes_within_bound() {
        assert!(check_cap("collateral", 3, 5).is_ok());
        assert!(check_cap("collateral", 5, 5).is_ok());
    }

    #[test]
    fn cap_check_fails_over_bound() {
        let err = check_cap("collateral", 6, 5).unwrap_err();
        assert!(matches!(err, CoreError::ResourceCap(_)));
    }

    #[test]
    fn take_within_cap_truncates_and_reports_drop_count() {
        let (kept, dropped) = take_within_cap(vec![1, 2, 3, 4, 5], 3);
        assert_eq!(kept, vec![1, 2, 3]);
        assert_eq!(dropped, 2);
    }

    #[test]
    fn take_within_cap_reports_no_drop_when_under() {
        let (kept, dropped) = take_within_cap(vec![1, 2], 3);
        assert_eq!(kept, vec![1, 2]);
        assert_eq!(dropped, 0);
    }
}
