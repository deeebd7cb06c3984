//! The transition engine. Each public method is one atomic operation: it
//! opens a store transaction, re-checks state under row locks, applies the
//! ledger and balance writes, and commits. Any error path drops the
//! transaction, which rolls every write back. Notifications go out after
//! commit and are best-effort.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::error::LeaveError;
use super::store::{LeaveRow, LeaveStore, LeaveTx, NewLeave, Notification};
use super::types::{CancelStatus, LeaveStatus, LeaveType};
use super::validation;

/// Inputs to `submit`, as received from the request layer.
#[derive(Debug, Clone)]
pub struct SubmitLeave {
    pub employee_code: String,
    pub leave_type: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub reason: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceChange {
    pub kind: LeaveType,
    pub before: i64,
    pub after: i64,
}

/// Result of a transition that may have touched a balance.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub leave: LeaveRow,
    pub balance: Option<BalanceChange>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepairReport {
    pub employees_scanned: usize,
    pub balances_clamped: usize,
}

#[derive(Clone)]
pub struct LeaveEngine<S> {
    store: S,
    cancel_window: Duration,
    repair_gate: Arc<Mutex<()>>,
}

impl<S: LeaveStore> LeaveEngine<S> {
    pub fn new(store: S, cancel_window_hours: i64) -> Self {
        Self {
            store,
            cancel_window: Duration::hours(cancel_window_hours),
            repair_gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Submit a new leave request. Checks balance sufficiency but never
    /// mutates it; the deduction happens on approval.
    pub async fn submit(&self, input: SubmitLeave) -> Result<LeaveRow, LeaveError> {
        let kind = validation::parse_leave_type(&input.leave_type)?;
        let today = Utc::now().date_naive();
        validation::validate_date_range(input.from_date, input.to_date, today)?;
        validation::validate_reason(&input.reason)?;
        let days = validation::leave_days(input.from_date, input.to_date);
        validation::validate_day_count(days, kind)?;

        let mut tx = self.store.begin().await?;
        let employee = tx
            .employee_for_update(&input.employee_code)
            .await?
            .ok_or(LeaveError::NotFound("employee"))?;
        if employee.designation.is_none() {
            return Err(LeaveError::InvalidState(
                "employee has no designation on file".to_string(),
            ));
        }
        let available = employee.balance(kind);
        if available < days {
            return Err(LeaveError::InsufficientBalance {
                kind,
                available,
                requested: days,
            });
        }
        if tx
            .overlap_exists(
                &input.employee_code,
                input.from_date,
                input.to_date,
                &[LeaveStatus::Pending, LeaveStatus::Approved],
                None,
            )
            .await?
        {
            return Err(LeaveError::Conflict);
        }

        let new_leave = NewLeave {
            employee_code: input.employee_code.clone(),
            leave_type: kind,
            from_date: input.from_date,
            to_date: input.to_date,
            days,
            reason: input.reason,
            location: input.location,
            applied_at: Utc::now(),
        };
        let id = tx.insert_leave(&new_leave).await?;
        tx.commit().await?;

        let leave = new_leave.into_row(id);
        info!(leave_id = id, employee = %leave.employee_code, kind = %kind, days, "leave submitted");
        self.notify(Notification {
            recipient: "admin".to_string(),
            event: "leave_submitted",
            message: format!(
                "{} applied for {} day(s) of {} leave ({} to {})",
                leave.employee_code, days, kind, leave.from_date, leave.to_date
            ),
        })
        .await;
        Ok(leave)
    }

    /// Approve a pending request, deducting the day count fixed at
    /// submission. Balance and overlap are re-validated here because other
    /// approvals may have landed since the request was submitted.
    pub async fn approve(&self, leave_id: u64) -> Result<TransitionOutcome, LeaveError> {
        let mut tx = self.store.begin().await?;
        let mut leave = tx
            .leave_for_update(leave_id)
            .await?
            .ok_or(LeaveError::NotFound("leave request"))?;
        match leave.status {
            LeaveStatus::Pending => {}
            LeaveStatus::Approved => {
                return Err(LeaveError::InvalidState(
                    "leave request is already approved".to_string(),
                ));
            }
            LeaveStatus::Rejected => {
                return Err(LeaveError::InvalidState(
                    "leave request was already rejected".to_string(),
                ));
            }
            LeaveStatus::Cancelled => {
                return Err(LeaveError::InvalidState(
                    "leave request was already cancelled".to_string(),
                ));
            }
        }
        // Should not survive submission, but never deduct against it.
        if leave.to_date < leave.from_date {
            return Err(LeaveError::InvalidState(
                "leave request has an inverted date range".to_string(),
            ));
        }
        let kind = leave.leave_type;
        // The stored day count is authoritative; it is never recomputed from
        // the dates here.
        let days = leave.days;
        validation::validate_day_count(days, kind)?;

        let employee = tx
            .employee_for_update(&leave.employee_code)
            .await?
            .ok_or(LeaveError::NotFound("employee"))?;
        let available = employee.balance(kind);
        if available < days {
            return Err(LeaveError::InsufficientBalance {
                kind,
                available,
                requested: days,
            });
        }
        if tx
            .overlap_exists(
                &leave.employee_code,
                leave.from_date,
                leave.to_date,
                &[LeaveStatus::Approved],
                Some(leave.id),
            )
            .await?
        {
            return Err(LeaveError::Conflict);
        }

        leave.status = LeaveStatus::Approved;
        leave.approved_at = Some(Utc::now());
        tx.update_leave(&leave).await?;

        let expected = validation::normalize_balance(available - days);
        tx.set_balance(&leave.employee_code, kind, expected).await?;
        // Re-read and verify. A mismatch means a lost update slipped past
        // the locks; abort instead of committing a bad balance.
        let stored = tx.balance(&leave.employee_code, kind).await?;
        if stored != expected {
            return Err(LeaveError::Integrity(format!(
                "{} balance for {} is {} after deduction, expected {}",
                kind, leave.employee_code, stored, expected
            )));
        }
        tx.commit().await?;

        info!(leave_id, employee = %leave.employee_code, kind = %kind, days, "leave approved");
        self.notify(Notification {
            recipient: leave.employee_code.clone(),
            event: "leave_approved",
            message: format!("Your {} leave request #{} was approved", kind, leave_id),
        })
        .await;
        Ok(TransitionOutcome {
            leave,
            balance: Some(BalanceChange {
                kind,
                before: available,
                after: expected,
            }),
        })
    }

    /// Reject a pending request. Nothing was deducted for it, so the balance
    /// is untouched.
    pub async fn reject(
        &self,
        leave_id: u64,
        remarks: Option<String>,
    ) -> Result<LeaveRow, LeaveError> {
        let mut tx = self.store.begin().await?;
        let mut leave = tx
            .leave_for_update(leave_id)
            .await?
            .ok_or(LeaveError::NotFound("leave request"))?;
        if leave.status != LeaveStatus::Pending {
            return Err(LeaveError::InvalidState(format!(
                "cannot reject a {} leave request",
                leave.status
            )));
        }
        leave.status = LeaveStatus::Rejected;
        leave.rejected_at = Some(Utc::now());
        leave.remarks = remarks;
        tx.update_leave(&leave).await?;
        tx.commit().await?;

        info!(leave_id, employee = %leave.employee_code, "leave rejected");
        self.notify(Notification {
            recipient: leave.employee_code.clone(),
            event: "leave_rejected",
            message: format!("Your leave request #{} was rejected", leave_id),
        })
        .await;
        Ok(leave)
    }

    /// Administrative cancel, valid from any non-cancelled state. Restores
    /// the balance only when the request had been approved, since that is
    /// the only transition that deducted it.
    pub async fn cancel_direct(
        &self,
        leave_id: u64,
        remarks: Option<String>,
    ) -> Result<TransitionOutcome, LeaveError> {
        let mut tx = self.store.begin().await?;
        let mut leave = tx
            .leave_for_update(leave_id)
            .await?
            .ok_or(LeaveError::NotFound("leave request"))?;
        if leave.status == LeaveStatus::Cancelled {
            return Err(LeaveError::InvalidState(
                "leave request is already cancelled".to_string(),
            ));
        }

        let mut balance = None;
        if leave.status == LeaveStatus::Approved {
            balance = Some(self.restore_balance(&mut tx, &leave).await?);
        }

        leave.status = LeaveStatus::Cancelled;
        leave.cancelled_at = Some(Utc::now());
        leave.remarks = remarks;
        tx.update_leave(&leave).await?;
        tx.commit().await?;

        info!(leave_id, employee = %leave.employee_code, restored = balance.is_some(), "leave cancelled by admin");
        self.notify(Notification {
            recipient: leave.employee_code.clone(),
            event: "leave_cancelled",
            message: format!("Your leave request #{} was cancelled", leave_id),
        })
        .await;
        Ok(TransitionOutcome { leave, balance })
    }

    /// Attach a cancellation sub-request. The primary status is untouched;
    /// an administrator decides via `approve_cancel` / `reject_cancel`.
    pub async fn request_cancel(
        &self,
        leave_id: u64,
        reason: String,
        requested_by: &str,
    ) -> Result<LeaveRow, LeaveError> {
        validation::validate_reason(&reason)?;
        let mut tx = self.store.begin().await?;
        let mut leave = tx
            .leave_for_update(leave_id)
            .await?
            .ok_or(LeaveError::NotFound("leave request"))?;
        leave.cancel_status = CancelStatus::Requested;
        leave.cancel_reason = Some(reason);
        tx.update_leave(&leave).await?;
        tx.commit().await?;

        info!(leave_id, requested_by, "cancellation requested");
        self.notify(Notification {
            recipient: "admin".to_string(),
            event: "cancel_requested",
            message: format!(
                "{} requested cancellation of leave request #{}",
                requested_by, leave_id
            ),
        })
        .await;
        Ok(leave)
    }

    /// Approve a pending cancellation sub-request. The leave moves to
    /// Cancelled; the balance is restored only when the request had been
    /// approved and its start date is still strictly in the future. Leave
    /// that has already started is not refundable.
    pub async fn approve_cancel(&self, leave_id: u64) -> Result<TransitionOutcome, LeaveError> {
        let mut tx = self.store.begin().await?;
        let mut leave = tx
            .leave_for_update(leave_id)
            .await?
            .ok_or(LeaveError::NotFound("leave request"))?;
        if leave.cancel_status != CancelStatus::Requested {
            return Err(LeaveError::InvalidState(
                "no cancellation request is pending for this leave".to_string(),
            ));
        }

        let today = Utc::now().date_naive();
        let mut balance = None;
        if leave.status == LeaveStatus::Approved {
            if leave.from_date > today {
                balance = Some(self.restore_balance(&mut tx, &leave).await?);
            }
            leave.cancelled_at = Some(Utc::now());
            leave.status = LeaveStatus::Cancelled;
        }
        leave.cancel_status = CancelStatus::Approved;
        tx.update_leave(&leave).await?;
        tx.commit().await?;

        info!(leave_id, restored = balance.is_some(), "cancellation approved");
        self.notify(Notification {
            recipient: leave.employee_code.clone(),
            event: "cancel_approved",
            message: format!(
                "Your cancellation request for leave #{} was approved",
                leave_id
            ),
        })
        .await;
        Ok(TransitionOutcome { leave, balance })
    }

    /// Turn down a cancellation sub-request. No balance effect.
    pub async fn reject_cancel(
        &self,
        leave_id: u64,
        reason: String,
    ) -> Result<LeaveRow, LeaveError> {
        validation::validate_reason(&reason)?;
        let mut tx = self.store.begin().await?;
        let mut leave = tx
            .leave_for_update(leave_id)
            .await?
            .ok_or(LeaveError::NotFound("leave request"))?;
        if leave.cancel_status != CancelStatus::Requested {
            return Err(LeaveError::InvalidState(
                "no cancellation request is pending for this leave".to_string(),
            ));
        }
        leave.cancel_status = CancelStatus::Rejected;
        leave.cancel_reason = Some(reason);
        tx.update_leave(&leave).await?;
        tx.commit().await?;

        info!(leave_id, "cancellation rejected");
        self.notify(Notification {
            recipient: leave.employee_code.clone(),
            event: "cancel_rejected",
            message: format!(
                "Your cancellation request for leave #{} was rejected",
                leave_id
            ),
        })
        .await;
        Ok(leave)
    }

    /// Employee self-service cancel of an approved request, allowed within a
    /// fixed window after approval and only while the leave has not started.
    pub async fn cancel_within_window(
        &self,
        leave_id: u64,
        employee_code: &str,
        reason: Option<String>,
    ) -> Result<TransitionOutcome, LeaveError> {
        let mut tx = self.store.begin().await?;
        let mut leave = tx
            .leave_for_update(leave_id)
            .await?
            .ok_or(LeaveError::NotFound("leave request"))?;
        // Requests belonging to someone else are indistinguishable from
        // missing ones.
        if leave.employee_code != employee_code {
            return Err(LeaveError::NotFound("leave request"));
        }
        if leave.status != LeaveStatus::Approved {
            return Err(LeaveError::InvalidState(
                "only an approved leave request can be self-cancelled".to_string(),
            ));
        }
        let approved_at = leave.approved_at.ok_or_else(|| {
            LeaveError::InvalidState("approval timestamp is missing".to_string())
        })?;
        let now = Utc::now();
        if now - approved_at > self.cancel_window {
            return Err(LeaveError::WindowExpired);
        }
        if leave.from_date <= now.date_naive() {
            return Err(LeaveError::AlreadyStarted);
        }

        let balance = self.restore_balance(&mut tx, &leave).await?;
        leave.status = LeaveStatus::Cancelled;
        leave.cancelled_at = Some(now);
        leave.remarks = reason;
        tx.update_leave(&leave).await?;
        tx.commit().await?;

        info!(leave_id, employee = %employee_code, "leave self-cancelled within window");
        self.notify(Notification {
            recipient: "admin".to_string(),
            event: "leave_self_cancelled",
            message: format!(
                "{} cancelled approved leave request #{}",
                employee_code, leave_id
            ),
        })
        .await;
        Ok(TransitionOutcome {
            leave,
            balance: Some(balance),
        })
    }

    /// Clamp every stored balance into [0, cap]. Self-healing pass, one
    /// transaction per employee, single-flight.
    pub async fn repair_balances(&self) -> Result<RepairReport, LeaveError> {
        let Ok(_gate) = self.repair_gate.try_lock() else {
            return Err(LeaveError::InvalidState(
                "balance repair is already running".to_string(),
            ));
        };

        let codes = self.store.employee_codes().await?;
        let mut clamped = 0usize;
        for code in &codes {
            let mut tx = self.store.begin().await?;
            let Some(employee) = tx.employee_for_update(code).await? else {
                continue;
            };
            for kind in LeaveType::ALL {
                let raw = employee.raw_balance(kind);
                let bounded = raw.clamp(0, kind.balance_cap());
                if bounded != raw {
                    tx.set_balance(code, kind, bounded).await?;
                    warn!(employee = %code, kind = %kind, raw, bounded, "clamped out-of-bound balance");
                    clamped += 1;
                }
            }
            tx.commit().await?;
        }
        info!(employees = codes.len(), clamped, "balance repair sweep finished");
        Ok(RepairReport {
            employees_scanned: codes.len(),
            balances_clamped: clamped,
        })
    }

    /// Inverse of the approval deduction: add the stored day count back.
    async fn restore_balance(
        &self,
        tx: &mut S::Tx<'_>,
        leave: &LeaveRow,
    ) -> Result<BalanceChange, LeaveError> {
        let kind = leave.leave_type;
        let employee = tx
            .employee_for_update(&leave.employee_code)
            .await?
            .ok_or(LeaveError::NotFound("employee"))?;
        let before = employee.balance(kind);
        let after = before + leave.days;
        tx.set_balance(&leave.employee_code, kind, after).await?;
        Ok(BalanceChange {
            kind,
            before,
            after,
        })
    }

    /// Notification failure never unwinds a committed transition.
    async fn notify(&self, note: Notification) {
        if let Err(err) = self.store.notify(note).await {
            warn!(error = %err, "failed to record notification");
        }
    }
}
