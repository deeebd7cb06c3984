use chrono::NaiveDate;

use super::error::LeaveError;
use super::types::LeaveType;

pub const MAX_REASON_LEN: usize = 500;

/// Parse a leave-type code ("CL"/"RH"/"EL", trimmed, case-insensitive).
pub fn parse_leave_type(raw: &str) -> Result<LeaveType, LeaveError> {
    raw.trim().parse::<LeaveType>().map_err(|_| {
        LeaveError::Validation(format!(
            "invalid leave type '{}'. Allowed: CL, RH, EL",
            raw.trim()
        ))
    })
}

/// A leave range must start today or later and must not end before it starts.
/// Date-only comparison; callers pass "today" so the check stays pure.
pub fn validate_date_range(
    from_date: NaiveDate,
    to_date: NaiveDate,
    today: NaiveDate,
) -> Result<(), LeaveError> {
    if from_date < today {
        return Err(LeaveError::Validation(
            "leave cannot start in the past".to_string(),
        ));
    }
    if to_date < from_date {
        return Err(LeaveError::Validation(
            "end date cannot be before start date".to_string(),
        ));
    }
    Ok(())
}

/// Inclusive day count of a leave range, floored at 1. Works on plain dates,
/// so time-of-day and timezone can never shave a day off.
pub fn leave_days(from_date: NaiveDate, to_date: NaiveDate) -> i64 {
    ((to_date - from_date).num_days() + 1).max(1)
}

/// Per-type ceiling on a single request's day count.
pub fn validate_day_count(days: i64, kind: LeaveType) -> Result<(), LeaveError> {
    if days < 1 {
        return Err(LeaveError::Validation(
            "leave must span at least one day".to_string(),
        ));
    }
    let max = kind.max_days_per_request();
    if days > max {
        return Err(LeaveError::Validation(format!(
            "{} leave cannot exceed {} day(s) per request",
            kind, max
        )));
    }
    Ok(())
}

pub fn validate_reason(reason: &str) -> Result<(), LeaveError> {
    if reason.chars().count() > MAX_REASON_LEN {
        return Err(LeaveError::Validation(format!(
            "reason must be at most {} characters",
            MAX_REASON_LEN
        )));
    }
    Ok(())
}

/// Balances read from storage are never trusted to be well-formed; anything
/// below zero normalizes to zero before comparison or arithmetic.
pub fn normalize_balance(value: i64) -> i64 {
    value.max(0)
}

/// Closed-interval overlap test: two inclusive ranges intersect when each
/// starts no later than the other ends.
pub fn ranges_overlap(
    a_from: NaiveDate,
    a_to: NaiveDate,
    b_from: NaiveDate,
    b_to: NaiveDate,
) -> bool {
    a_from <= b_to && a_to >= b_from
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn day_count_is_inclusive() {
        assert_eq!(leave_days(d("2025-03-10"), d("2025-03-12")), 3);
        assert_eq!(leave_days(d("2025-03-10"), d("2025-03-10")), 1);
        // month boundary
        assert_eq!(leave_days(d("2025-01-31"), d("2025-02-02")), 3);
        // floored at one even for inverted input
        assert_eq!(leave_days(d("2025-03-12"), d("2025-03-10")), 1);
    }

    #[test]
    fn date_range_rules() {
        let today = d("2025-03-01");
        assert!(validate_date_range(d("2025-03-01"), d("2025-03-01"), today).is_ok());
        assert!(validate_date_range(d("2025-03-05"), d("2025-03-04"), today).is_err());
        assert!(validate_date_range(d("2025-02-28"), d("2025-03-05"), today).is_err());
    }

    #[test]
    fn day_ceilings_per_type() {
        assert!(validate_day_count(30, LeaveType::Cl).is_ok());
        assert!(validate_day_count(31, LeaveType::Cl).is_err());
        assert!(validate_day_count(15, LeaveType::Rh).is_ok());
        assert!(validate_day_count(16, LeaveType::Rh).is_err());
        assert!(validate_day_count(60, LeaveType::El).is_ok());
        assert!(validate_day_count(61, LeaveType::El).is_err());
        assert!(validate_day_count(0, LeaveType::Cl).is_err());
    }

    #[test]
    fn type_parsing_is_lenient_on_case_and_whitespace() {
        assert_eq!(parse_leave_type(" cl ").unwrap(), LeaveType::Cl);
        assert_eq!(parse_leave_type("EL").unwrap(), LeaveType::El);
        assert!(parse_leave_type("casual").is_err());
        assert!(parse_leave_type("").is_err());
    }

    #[test]
    fn reason_length_cap() {
        assert!(validate_reason(&"x".repeat(500)).is_ok());
        assert!(validate_reason(&"x".repeat(501)).is_err());
    }

    #[test]
    fn balance_normalization_never_negative() {
        assert_eq!(normalize_balance(-3), 0);
        assert_eq!(normalize_balance(0), 0);
        assert_eq!(normalize_balance(12), 12);
    }

    #[test]
    fn closed_interval_overlap() {
        // proper overlap
        assert!(ranges_overlap(
            d("2024-01-10"),
            d("2024-01-12"),
            d("2024-01-11"),
            d("2024-01-15")
        ));
        // touching endpoints count as overlap (inclusive ranges)
        assert!(ranges_overlap(
            d("2024-01-10"),
            d("2024-01-12"),
            d("2024-01-12"),
            d("2024-01-14")
        ));
        // disjoint
        assert!(!ranges_overlap(
            d("2024-01-10"),
            d("2024-01-12"),
            d("2024-01-13"),
            d("2024-01-14")
        ));
    }
}
