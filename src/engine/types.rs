use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// The three leave categories, keyed by their 3-letter codes everywhere
/// (requests, storage, notifications). Parsing is trimmed and
/// case-insensitive, so "cl", " CL " and "Cl" all resolve to casual leave.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum LeaveType {
    /// Casual leave
    #[strum(serialize = "CL")]
    #[serde(rename = "CL")]
    Cl,
    /// Restricted holiday
    #[strum(serialize = "RH")]
    #[serde(rename = "RH")]
    Rh,
    /// Earned leave
    #[strum(serialize = "EL")]
    #[serde(rename = "EL")]
    El,
}

impl LeaveType {
    pub const ALL: [LeaveType; 3] = [LeaveType::Cl, LeaveType::Rh, LeaveType::El];

    /// Soft cap on the stored balance, enforced only by the repair sweep.
    pub fn balance_cap(&self) -> i64 {
        match self {
            LeaveType::Cl => 30,
            LeaveType::Rh => 15,
            LeaveType::El => 18,
        }
    }

    /// Ceiling on the day count of a single request.
    pub fn max_days_per_request(&self) -> i64 {
        match self {
            LeaveType::Cl => 30,
            LeaveType::Rh => 15,
            LeaveType::El => 60,
        }
    }

    /// Column holding this balance in the employees table. Fixed mapping,
    /// never derived from request input.
    pub fn balance_column(&self) -> &'static str {
        match self {
            LeaveType::Cl => "cl_balance",
            LeaveType::Rh => "rh_balance",
            LeaveType::El => "el_balance",
        }
    }
}

/// Primary request status. Pending may move to any of the other three;
/// Approved may only move to Cancelled; Rejected and Cancelled are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LeaveStatus::Rejected | LeaveStatus::Cancelled)
    }
}

/// Secondary state machine for cancellation sub-requests, layered on top of
/// the primary status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum CancelStatus {
    None,
    Requested,
    Approved,
    Rejected,
}
