use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::error::LeaveError;
use super::types::{CancelStatus, LeaveStatus, LeaveType};
use super::validation::normalize_balance;

/// Per-employee balance record. Balances are stored raw; `balance()` applies
/// normalization so callers never see a negative value.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmployeeRow {
    pub employee_code: String,
    pub name: String,
    pub designation: Option<String>,
    pub cl_balance: i64,
    pub rh_balance: i64,
    pub el_balance: i64,
}

impl EmployeeRow {
    /// Raw stored value, possibly out of bounds. Used by the repair sweep.
    pub fn raw_balance(&self, kind: LeaveType) -> i64 {
        match kind {
            LeaveType::Cl => self.cl_balance,
            LeaveType::Rh => self.rh_balance,
            LeaveType::El => self.el_balance,
        }
    }

    pub fn balance(&self, kind: LeaveType) -> i64 {
        normalize_balance(self.raw_balance(kind))
    }
}

/// A leave request as held in the ledger. Mutated in place by transitions,
/// never deleted. `days` is fixed at submission and never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRow {
    pub id: u64,
    pub employee_code: String,
    pub leave_type: LeaveType,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub days: i64,
    pub reason: String,
    pub location: Option<String>,
    pub status: LeaveStatus,
    pub applied_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
    pub cancel_status: CancelStatus,
    pub cancel_reason: Option<String>,
}

/// Fields of a leave request at the moment of submission.
#[derive(Debug, Clone)]
pub struct NewLeave {
    pub employee_code: String,
    pub leave_type: LeaveType,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub days: i64,
    pub reason: String,
    pub location: Option<String>,
    pub applied_at: DateTime<Utc>,
}

impl NewLeave {
    pub fn into_row(self, id: u64) -> LeaveRow {
        LeaveRow {
            id,
            employee_code: self.employee_code,
            leave_type: self.leave_type,
            from_date: self.from_date,
            to_date: self.to_date,
            days: self.days,
            reason: self.reason,
            location: self.location,
            status: LeaveStatus::Pending,
            applied_at: self.applied_at,
            approved_at: None,
            rejected_at: None,
            cancelled_at: None,
            remarks: None,
            cancel_status: CancelStatus::None,
            cancel_reason: None,
        }
    }
}

/// Best-effort message dropped into the notifications relation after a
/// transition commits. Delivery is a collaborator concern, not a guarantee.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub recipient: String,
    pub event: &'static str,
    pub message: String,
}

/// One open transaction against the ledger and balance store. Reads of rows
/// that will be mutated take row locks where the backend supports them.
/// Dropping a transaction without `commit` rolls every write back.
#[allow(async_fn_in_trait)]
pub trait LeaveTx {
    async fn employee_for_update(&mut self, code: &str)
    -> Result<Option<EmployeeRow>, LeaveError>;
    async fn leave_for_update(&mut self, id: u64) -> Result<Option<LeaveRow>, LeaveError>;
    async fn insert_leave(&mut self, leave: &NewLeave) -> Result<u64, LeaveError>;
    async fn update_leave(&mut self, leave: &LeaveRow) -> Result<(), LeaveError>;
    async fn set_balance(
        &mut self,
        code: &str,
        kind: LeaveType,
        value: i64,
    ) -> Result<(), LeaveError>;
    /// Re-read the stored balance, bypassing any cached row. Used by the
    /// post-deduction integrity check.
    async fn balance(&mut self, code: &str, kind: LeaveType) -> Result<i64, LeaveError>;
    /// True when the employee has another request in one of `statuses` whose
    /// inclusive date range intersects [from_date, to_date].
    async fn overlap_exists(
        &mut self,
        code: &str,
        from_date: NaiveDate,
        to_date: NaiveDate,
        statuses: &[LeaveStatus],
        exclude_leave: Option<u64>,
    ) -> Result<bool, LeaveError>;
    async fn commit(self) -> Result<(), LeaveError>;
}

/// The injected store dependency. The engine never touches a connection pool
/// directly; production uses the MySQL store, tests an in-memory one.
#[allow(async_fn_in_trait)]
pub trait LeaveStore {
    type Tx<'a>: LeaveTx
    where
        Self: 'a;

    async fn begin(&self) -> Result<Self::Tx<'_>, LeaveError>;
    /// All employee codes, for the balance repair sweep.
    async fn employee_codes(&self) -> Result<Vec<String>, LeaveError>;
    /// Insert a notification outside any transition transaction.
    async fn notify(&self, note: Notification) -> Result<(), LeaveError>;
}
