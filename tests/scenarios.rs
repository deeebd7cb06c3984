//! End-to-end lifecycle scenarios driven through the in-memory store. Each
//! test builds its own store so state never leaks between them.

use chrono::{Duration, NaiveDate, Utc};
use leavedesk::engine::{
    CancelStatus, EmployeeRow, LeaveEngine, LeaveError, LeaveRow, LeaveStatus, LeaveType,
    MemStore, SubmitLeave,
};

const WINDOW_HOURS: i64 = 48;

fn engine_with(store: &MemStore) -> LeaveEngine<MemStore> {
    LeaveEngine::new(store.clone(), WINDOW_HOURS)
}

fn employee(code: &str, cl: i64, rh: i64, el: i64) -> EmployeeRow {
    EmployeeRow {
        employee_code: code.to_string(),
        name: "Test Person".to_string(),
        designation: Some("Engineer".to_string()),
        cl_balance: cl,
        rh_balance: rh,
        el_balance: el,
    }
}

fn day(offset: i64) -> NaiveDate {
    Utc::now().date_naive() + Duration::days(offset)
}

fn submission(code: &str, kind: &str, from: NaiveDate, to: NaiveDate) -> SubmitLeave {
    SubmitLeave {
        employee_code: code.to_string(),
        leave_type: kind.to_string(),
        from_date: from,
        to_date: to,
        reason: "personal".to_string(),
        location: None,
    }
}

/// A fully-formed row for states the public operations cannot produce
/// directly (e.g. back-dated approvals).
#[allow(clippy::too_many_arguments)]
fn seeded_leave(
    id: u64,
    code: &str,
    kind: LeaveType,
    from: NaiveDate,
    to: NaiveDate,
    days: i64,
    status: LeaveStatus,
    approved_hours_ago: Option<i64>,
) -> LeaveRow {
    LeaveRow {
        id,
        employee_code: code.to_string(),
        leave_type: kind,
        from_date: from,
        to_date: to,
        days,
        reason: "seeded".to_string(),
        location: None,
        status,
        applied_at: Utc::now() - Duration::days(3),
        approved_at: approved_hours_ago.map(|h| Utc::now() - Duration::hours(h)),
        rejected_at: None,
        cancelled_at: None,
        remarks: None,
        cancel_status: CancelStatus::None,
        cancel_reason: None,
    }
}

#[actix_web::test]
async fn end_to_end_earned_leave_lifecycle() -> anyhow::Result<()> {
    let store = MemStore::new();
    store.put_employee(employee("EMP001", 30, 15, 18)).await;
    let engine = engine_with(&store);

    // Submit: pending, three days, balance untouched.
    let leave = engine
        .submit(submission("EMP001", "EL", day(10), day(12)))
        .await?;
    assert_eq!(leave.status, LeaveStatus::Pending);
    assert_eq!(leave.days, 3);
    assert_eq!(store.employee("EMP001").await.unwrap().el_balance, 18);

    // Approve: deducted exactly the submitted day count.
    let outcome = engine.approve(leave.id).await?;
    assert_eq!(outcome.leave.status, LeaveStatus::Approved);
    assert!(outcome.leave.approved_at.is_some());
    // day count recorded at approval equals the one fixed at submission
    assert_eq!(outcome.leave.days, leave.days);
    let change = outcome.balance.unwrap();
    assert_eq!((change.before, change.after), (18, 15));
    assert_eq!(store.employee("EMP001").await.unwrap().el_balance, 15);

    // Admin cancel: restoration symmetric with the deduction.
    let outcome = engine.cancel_direct(leave.id, None).await?;
    assert_eq!(outcome.leave.status, LeaveStatus::Cancelled);
    let change = outcome.balance.unwrap();
    assert_eq!((change.before, change.after), (15, 18));
    assert_eq!(store.employee("EMP001").await.unwrap().el_balance, 18);
    Ok(())
}

#[actix_web::test]
async fn approval_deducts_at_most_once() -> anyhow::Result<()> {
    let store = MemStore::new();
    store.put_employee(employee("EMP002", 30, 15, 18)).await;
    let engine = engine_with(&store);

    let leave = engine
        .submit(submission("EMP002", "EL", day(5), day(7)))
        .await?;
    engine.approve(leave.id).await?;
    assert_eq!(store.employee("EMP002").await.unwrap().el_balance, 15);

    let err = engine.approve(leave.id).await.unwrap_err();
    assert!(matches!(err, LeaveError::InvalidState(_)));
    assert_eq!(store.employee("EMP002").await.unwrap().el_balance, 15);
    Ok(())
}

#[actix_web::test]
async fn concurrent_approvals_deduct_once() -> anyhow::Result<()> {
    let store = MemStore::new();
    store.put_employee(employee("EMP003", 30, 15, 18)).await;
    let engine = engine_with(&store);

    let leave = engine
        .submit(submission("EMP003", "EL", day(5), day(7)))
        .await?;

    let (a, b) = futures::join!(engine.approve(leave.id), engine.approve(leave.id));
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1, "exactly one approval may win");
    assert_eq!(store.employee("EMP003").await.unwrap().el_balance, 15);
    Ok(())
}

#[actix_web::test]
async fn overlapping_submission_is_rejected() -> anyhow::Result<()> {
    let store = MemStore::new();
    store.put_employee(employee("EMP004", 30, 15, 18)).await;
    let engine = engine_with(&store);

    engine
        .submit(submission("EMP004", "CL", day(9), day(11)))
        .await?;
    // day(10)..day(14) intersects the pending request above
    let err = engine
        .submit(submission("EMP004", "CL", day(10), day(14)))
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::Conflict));

    // a disjoint range is fine
    engine
        .submit(submission("EMP004", "CL", day(12), day(13)))
        .await?;
    Ok(())
}

#[actix_web::test]
async fn approval_recheck_catches_new_overlap() -> anyhow::Result<()> {
    let store = MemStore::new();
    store.put_employee(employee("EMP005", 30, 15, 18)).await;
    // Two overlapping pending requests, as can happen when both were
    // submitted before either was approved.
    store
        .put_leave(seeded_leave(
            1,
            "EMP005",
            LeaveType::Cl,
            day(9),
            day(11),
            3,
            LeaveStatus::Pending,
            None,
        ))
        .await;
    store
        .put_leave(seeded_leave(
            2,
            "EMP005",
            LeaveType::Cl,
            day(10),
            day(14),
            5,
            LeaveStatus::Pending,
            None,
        ))
        .await;
    let engine = engine_with(&store);

    engine.approve(1).await?;
    let err = engine.approve(2).await.unwrap_err();
    assert!(matches!(err, LeaveError::Conflict));
    assert_eq!(store.leave(2).await.unwrap().status, LeaveStatus::Pending);
    Ok(())
}

#[actix_web::test]
async fn insufficient_balance_rejected_at_submission() -> anyhow::Result<()> {
    let store = MemStore::new();
    store.put_employee(employee("EMP006", 2, 15, 18)).await;
    let engine = engine_with(&store);

    let err = engine
        .submit(submission("EMP006", "CL", day(5), day(7)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LeaveError::InsufficientBalance {
            available: 2,
            requested: 3,
            ..
        }
    ));
    assert_eq!(store.employee("EMP006").await.unwrap().cl_balance, 2);
    Ok(())
}

#[actix_web::test]
async fn insufficient_balance_rechecked_at_approval() -> anyhow::Result<()> {
    let store = MemStore::new();
    store.put_employee(employee("EMP007", 30, 15, 18)).await;
    let engine = engine_with(&store);

    // Both submissions pass the sufficiency check against 18 days.
    let first = engine
        .submit(submission("EMP007", "EL", day(5), day(14)))
        .await?;
    let second = engine
        .submit(submission("EMP007", "EL", day(20), day(29)))
        .await?;

    engine.approve(first.id).await?;
    assert_eq!(store.employee("EMP007").await.unwrap().el_balance, 8);

    // Only 8 days left for the second 10-day request.
    let err = engine.approve(second.id).await.unwrap_err();
    assert!(matches!(err, LeaveError::InsufficientBalance { .. }));
    assert_eq!(store.employee("EMP007").await.unwrap().el_balance, 8);
    assert_eq!(
        store.leave(second.id).await.unwrap().status,
        LeaveStatus::Pending
    );
    Ok(())
}

#[actix_web::test]
async fn reject_is_final_and_balance_neutral() -> anyhow::Result<()> {
    let store = MemStore::new();
    store.put_employee(employee("EMP008", 30, 15, 18)).await;
    let engine = engine_with(&store);

    let leave = engine
        .submit(submission("EMP008", "RH", day(5), day(5)))
        .await?;
    let rejected = engine
        .reject(leave.id, Some("short staffed".to_string()))
        .await?;
    assert_eq!(rejected.status, LeaveStatus::Rejected);
    assert!(rejected.rejected_at.is_some());
    assert_eq!(store.employee("EMP008").await.unwrap().rh_balance, 15);

    // Terminal states refuse further transitions.
    let err = engine.reject(leave.id, None).await.unwrap_err();
    assert!(matches!(err, LeaveError::InvalidState(_)));
    let err = engine.approve(leave.id).await.unwrap_err();
    assert!(matches!(err, LeaveError::InvalidState(_)));
    Ok(())
}

#[actix_web::test]
async fn cancelling_pending_leave_never_touches_balance() -> anyhow::Result<()> {
    let store = MemStore::new();
    store.put_employee(employee("EMP009", 30, 15, 18)).await;
    let engine = engine_with(&store);

    let leave = engine
        .submit(submission("EMP009", "CL", day(5), day(6)))
        .await?;
    let outcome = engine.cancel_direct(leave.id, None).await?;
    assert_eq!(outcome.leave.status, LeaveStatus::Cancelled);
    assert!(outcome.balance.is_none());
    assert_eq!(store.employee("EMP009").await.unwrap().cl_balance, 30);

    let err = engine.cancel_direct(leave.id, None).await.unwrap_err();
    assert!(matches!(err, LeaveError::InvalidState(_)));
    Ok(())
}

#[actix_web::test]
async fn cancellation_subrequest_flow_restores_future_leave() -> anyhow::Result<()> {
    let store = MemStore::new();
    store.put_employee(employee("EMP010", 30, 15, 18)).await;
    let engine = engine_with(&store);

    let leave = engine
        .submit(submission("EMP010", "EL", day(10), day(12)))
        .await?;
    engine.approve(leave.id).await?;
    assert_eq!(store.employee("EMP010").await.unwrap().el_balance, 15);

    // Sub-request leaves the primary status alone.
    let updated = engine
        .request_cancel(leave.id, "plans changed".to_string(), "EMP010")
        .await?;
    assert_eq!(updated.status, LeaveStatus::Approved);
    assert_eq!(updated.cancel_status, CancelStatus::Requested);

    // Approving it cancels the leave and refunds the untaken days.
    let outcome = engine.approve_cancel(leave.id).await?;
    assert_eq!(outcome.leave.status, LeaveStatus::Cancelled);
    assert_eq!(outcome.leave.cancel_status, CancelStatus::Approved);
    assert_eq!(store.employee("EMP010").await.unwrap().el_balance, 18);
    Ok(())
}

#[actix_web::test]
async fn approving_cancel_of_started_leave_keeps_deduction() -> anyhow::Result<()> {
    let store = MemStore::new();
    store.put_employee(employee("EMP011", 30, 15, 15)).await;
    let mut leave = seeded_leave(
        7,
        "EMP011",
        LeaveType::El,
        day(-1),
        day(1),
        3,
        LeaveStatus::Approved,
        Some(30),
    );
    leave.cancel_status = CancelStatus::Requested;
    store.put_leave(leave).await;
    let engine = engine_with(&store);

    let outcome = engine.approve_cancel(7).await?;
    assert_eq!(outcome.leave.status, LeaveStatus::Cancelled);
    // leave already started, so the days stay consumed
    assert!(outcome.balance.is_none());
    assert_eq!(store.employee("EMP011").await.unwrap().el_balance, 15);
    Ok(())
}

#[actix_web::test]
async fn rejecting_cancel_subrequest_changes_nothing_else() -> anyhow::Result<()> {
    let store = MemStore::new();
    store.put_employee(employee("EMP012", 30, 15, 18)).await;
    let engine = engine_with(&store);

    let leave = engine
        .submit(submission("EMP012", "EL", day(10), day(11)))
        .await?;
    engine.approve(leave.id).await?;
    engine
        .request_cancel(leave.id, "changed my mind".to_string(), "EMP012")
        .await?;
    let updated = engine
        .reject_cancel(leave.id, "leave already arranged".to_string())
        .await?;
    assert_eq!(updated.status, LeaveStatus::Approved);
    assert_eq!(updated.cancel_status, CancelStatus::Rejected);
    assert_eq!(store.employee("EMP012").await.unwrap().el_balance, 16);

    // A second decision on the same sub-request is invalid.
    let err = engine.approve_cancel(leave.id).await.unwrap_err();
    assert!(matches!(err, LeaveError::InvalidState(_)));
    Ok(())
}

#[actix_web::test]
async fn self_cancel_honours_the_48h_window() -> anyhow::Result<()> {
    let store = MemStore::new();
    store.put_employee(employee("EMP013", 30, 15, 12)).await;
    // approved 49 hours ago: window gone
    store
        .put_leave(seeded_leave(
            1,
            "EMP013",
            LeaveType::El,
            day(10),
            day(12),
            3,
            LeaveStatus::Approved,
            Some(49),
        ))
        .await;
    // approved 47 hours ago: still inside the window
    store
        .put_leave(seeded_leave(
            2,
            "EMP013",
            LeaveType::El,
            day(20),
            day(22),
            3,
            LeaveStatus::Approved,
            Some(47),
        ))
        .await;
    let engine = engine_with(&store);

    let err = engine
        .cancel_within_window(1, "EMP013", None)
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::WindowExpired));
    assert_eq!(store.employee("EMP013").await.unwrap().el_balance, 12);

    let outcome = engine.cancel_within_window(2, "EMP013", None).await?;
    assert_eq!(outcome.leave.status, LeaveStatus::Cancelled);
    assert_eq!(store.employee("EMP013").await.unwrap().el_balance, 15);
    Ok(())
}

#[actix_web::test]
async fn self_cancel_guards_ownership_start_and_state() -> anyhow::Result<()> {
    let store = MemStore::new();
    store.put_employee(employee("EMP014", 30, 15, 18)).await;
    store.put_employee(employee("EMP015", 30, 15, 18)).await;
    // started today
    store
        .put_leave(seeded_leave(
            1,
            "EMP014",
            LeaveType::Cl,
            day(0),
            day(2),
            3,
            LeaveStatus::Approved,
            Some(1),
        ))
        .await;
    // still pending
    store
        .put_leave(seeded_leave(
            2,
            "EMP014",
            LeaveType::Cl,
            day(10),
            day(10),
            1,
            LeaveStatus::Pending,
            None,
        ))
        .await;
    let engine = engine_with(&store);

    let err = engine
        .cancel_within_window(1, "EMP014", None)
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::AlreadyStarted));

    // someone else's request looks like a missing one
    let err = engine
        .cancel_within_window(1, "EMP015", None)
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::NotFound(_)));

    let err = engine
        .cancel_within_window(2, "EMP014", None)
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::InvalidState(_)));
    Ok(())
}

#[actix_web::test]
async fn submission_validations_abort_before_any_write() -> anyhow::Result<()> {
    let store = MemStore::new();
    store.put_employee(employee("EMP016", 30, 15, 18)).await;
    let mut no_designation = employee("EMP017", 30, 15, 18);
    no_designation.designation = None;
    store.put_employee(no_designation).await;
    let engine = engine_with(&store);

    let err = engine
        .submit(submission("EMP016", "sick", day(5), day(6)))
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::Validation(_)));

    let err = engine
        .submit(submission("EMP016", "CL", day(-1), day(2)))
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::Validation(_)));

    let err = engine
        .submit(submission("EMP016", "CL", day(6), day(5)))
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::Validation(_)));

    let err = engine
        .submit(submission("EMP017", "CL", day(5), day(6)))
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::InvalidState(_)));

    let err = engine
        .submit(submission("EMP999", "CL", day(5), day(6)))
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::NotFound(_)));

    // a 16-day restricted holiday breaches the per-request ceiling
    let err = engine
        .submit(submission("EMP016", "RH", day(5), day(20)))
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::Validation(_)));
    Ok(())
}

#[actix_web::test]
async fn repair_sweep_clamps_out_of_bound_balances() -> anyhow::Result<()> {
    let store = MemStore::new();
    store.put_employee(employee("EMP018", -5, 40, 10)).await;
    store.put_employee(employee("EMP019", 12, 3, 18)).await;
    let engine = engine_with(&store);

    let report = engine.repair_balances().await?;
    assert_eq!(report.employees_scanned, 2);
    assert_eq!(report.balances_clamped, 2);

    let repaired = store.employee("EMP018").await.unwrap();
    assert_eq!(repaired.cl_balance, 0); // negative clamped up
    assert_eq!(repaired.rh_balance, 15); // above cap clamped down
    assert_eq!(repaired.el_balance, 10);

    // in-bound balances untouched
    let untouched = store.employee("EMP019").await.unwrap();
    assert_eq!(
        (untouched.cl_balance, untouched.rh_balance, untouched.el_balance),
        (12, 3, 18)
    );
    Ok(())
}

#[actix_web::test]
async fn transitions_record_notifications() -> anyhow::Result<()> {
    let store = MemStore::new();
    store.put_employee(employee("EMP020", 30, 15, 18)).await;
    let engine = engine_with(&store);

    let leave = engine
        .submit(submission("EMP020", "CL", day(5), day(6)))
        .await?;
    engine.approve(leave.id).await?;

    let events: Vec<&str> = store.notifications().iter().map(|n| n.event).collect();
    assert_eq!(events, vec!["leave_submitted", "leave_approved"]);
    assert_eq!(store.notifications()[0].recipient, "admin");
    assert_eq!(store.notifications()[1].recipient, "EMP020");
    Ok(())
}
