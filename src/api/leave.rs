use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::engine::{LeaveEngine, LeaveError, MySqlStore, SubmitLeave};
use crate::model::employee::Employee;
use crate::model::leave_request::LeaveRecord;

type Engine = LeaveEngine<MySqlStore>;

const LEAVE_COLUMNS: &str = "id, employee_code, leave_type, from_date, to_date, days, reason, \
     location, status, applied_at, approved_at, rejected_at, cancelled_at, remarks, \
     cancel_status, cancel_reason";

#[derive(Deserialize, ToSchema)]
pub struct SubmitLeaveDto {
    #[schema(example = "EMP001")]
    pub employee_code: String,
    /// Leave type code: CL, RH or EL (case-insensitive)
    #[schema(example = "EL")]
    pub leave_type: String,
    #[schema(example = "2026-03-10", format = "date", value_type = String)]
    pub from_date: NaiveDate,
    #[schema(example = "2026-03-12", format = "date", value_type = String)]
    pub to_date: NaiveDate,
    #[schema(example = "Family function")]
    pub reason: String,
    #[schema(example = "Head office", nullable = true)]
    pub location: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct RemarksDto {
    #[schema(example = "Team at full capacity that week", nullable = true)]
    pub remarks: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CancelRequestDto {
    #[schema(example = "Travel plans changed")]
    pub reason: String,
    #[schema(example = "EMP001")]
    pub requested_by: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ReasonDto {
    #[schema(example = "Leave already consumed")]
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SelfCancelDto {
    #[schema(example = "EMP001")]
    pub employee_code: String,
    #[schema(example = "No longer needed", nullable = true)]
    pub reason: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Filter by employee code
    #[schema(example = "EMP001")]
    pub employee_code: Option<String>,
    /// Filter by leave status
    #[schema(example = "pending")]
    pub status: Option<String>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u64>, // 1-based
    /// Pagination per page number
    #[schema(example = 10)]
    pub per_page: Option<u64>, // items per page
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRecord>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    Str(&'a str),
}

/* =========================
Submit leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = SubmitLeaveDto,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Leave request submitted, status pending"),
        (status = 400, description = "Validation failure, insufficient balance or overlapping dates"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Leave"
)]
pub async fn submit_leave(
    engine: web::Data<Engine>,
    payload: web::Json<SubmitLeaveDto>,
) -> Result<impl Responder, LeaveError> {
    let dto = payload.into_inner();
    let leave = engine
        .submit(SubmitLeave {
            employee_code: dto.employee_code,
            leave_type: dto.leave_type,
            from_date: dto.from_date,
            to_date: dto.to_date,
            reason: dto.reason,
            location: dto.location,
        })
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave request submitted",
        "leave": leave
    })))
}

/* =========================
Approve leave (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved, balance deducted"),
        (status = 400, description = "Already processed, insufficient balance or overlap"),
        (status = 404, description = "Leave request not found")
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> Result<impl Responder, LeaveError> {
    let outcome = engine.approve(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave approved",
        "leave": outcome.leave,
        "balance": outcome.balance
    })))
}

/* =========================
Reject leave (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    request_body = RemarksDto,
    responses(
        (status = 200, description = "Leave rejected, no balance effect"),
        (status = 400, description = "Leave request is not pending"),
        (status = 404, description = "Leave request not found")
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    payload: web::Json<RemarksDto>,
) -> Result<impl Responder, LeaveError> {
    let leave = engine
        .reject(path.into_inner(), payload.into_inner().remarks)
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave rejected",
        "leave": leave
    })))
}

/* =========================
Cancel leave directly (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/cancel",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to cancel")
    ),
    request_body = RemarksDto,
    responses(
        (status = 200, description = "Leave cancelled; balance restored if it was approved"),
        (status = 400, description = "Leave request is already cancelled"),
        (status = 404, description = "Leave request not found")
    ),
    tag = "Leave"
)]
pub async fn cancel_leave(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    payload: web::Json<RemarksDto>,
) -> Result<impl Responder, LeaveError> {
    let outcome = engine
        .cancel_direct(path.into_inner(), payload.into_inner().remarks)
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave cancelled",
        "leave": outcome.leave,
        "balance": outcome.balance
    })))
}

/* =========================
Cancellation sub-request flow
========================= */
#[utoipa::path(
    post,
    path = "/api/leave/{leave_id}/cancel-request",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request")
    ),
    request_body = CancelRequestDto,
    responses(
        (status = 200, description = "Cancellation requested, admin notified"),
        (status = 404, description = "Leave request not found")
    ),
    tag = "Leave"
)]
pub async fn request_cancel(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    payload: web::Json<CancelRequestDto>,
) -> Result<impl Responder, LeaveError> {
    let dto = payload.into_inner();
    let leave = engine
        .request_cancel(path.into_inner(), dto.reason, &dto.requested_by)
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Cancellation requested",
        "leave": leave
    })))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/cancel-request/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request")
    ),
    responses(
        (status = 200, description = "Cancellation approved; balance restored for future-dated approved leave"),
        (status = 400, description = "No cancellation request is pending"),
        (status = 404, description = "Leave request not found")
    ),
    tag = "Leave"
)]
pub async fn approve_cancel(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> Result<impl Responder, LeaveError> {
    let outcome = engine.approve_cancel(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Cancellation approved",
        "leave": outcome.leave,
        "balance": outcome.balance
    })))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/cancel-request/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request")
    ),
    request_body = ReasonDto,
    responses(
        (status = 200, description = "Cancellation rejected, no balance effect"),
        (status = 400, description = "No cancellation request is pending"),
        (status = 404, description = "Leave request not found")
    ),
    tag = "Leave"
)]
pub async fn reject_cancel(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    payload: web::Json<ReasonDto>,
) -> Result<impl Responder, LeaveError> {
    let leave = engine
        .reject_cancel(path.into_inner(), payload.into_inner().reason)
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Cancellation rejected",
        "leave": leave
    })))
}

/* =========================
Employee self-service cancel (48h window)
========================= */
#[utoipa::path(
    post,
    path = "/api/leave/{leave_id}/self-cancel",
    params(
        ("leave_id" = u64, Path, description = "ID of the approved leave request")
    ),
    request_body = SelfCancelDto,
    responses(
        (status = 200, description = "Leave cancelled and balance restored"),
        (status = 400, description = "Window expired, leave already started, or not approved"),
        (status = 404, description = "Leave request not found for this employee")
    ),
    tag = "Leave"
)]
pub async fn self_cancel(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    payload: web::Json<SelfCancelDto>,
) -> Result<impl Responder, LeaveError> {
    let dto = payload.into_inner();
    let outcome = engine
        .cancel_within_window(path.into_inner(), &dto.employee_code, dto.reason)
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave cancelled",
        "leave": outcome.leave,
        "balance": outcome.balance
    })))
}

/* =========================
Balance endpoints
========================= */
#[utoipa::path(
    get,
    path = "/api/balances/{employee_code}",
    params(
        ("employee_code" = String, Path, description = "Employee code, e.g. EMP001")
    ),
    responses(
        (status = 200, description = "Employee with current balances", body = Employee),
        (status = 404, description = "Employee not found")
    ),
    tag = "Balance"
)]
pub async fn get_balances(
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let code = path.into_inner();
    let employee = sqlx::query_as::<_, Employee>(
        "SELECT employee_code, name, designation, cl_balance, rh_balance, el_balance \
         FROM employees WHERE employee_code = ?",
    )
    .bind(&code)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, employee = %code, "Failed to fetch balances");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    match employee {
        Some(data) => Ok(HttpResponse::Ok().json(data)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Employee not found"
        }))),
    }
}

#[utoipa::path(
    post,
    path = "/api/balances/repair",
    responses(
        (status = 200, description = "Repair sweep finished; out-of-bound balances clamped"),
        (status = 400, description = "A repair sweep is already running")
    ),
    tag = "Balance"
)]
pub async fn repair_balances(engine: web::Data<Engine>) -> Result<impl Responder, LeaveError> {
    let report = engine.repair_balances().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Balance repair finished",
        "report": report
    })))
}

/* =========================
Read endpoints
========================= */
/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRecord),
        (status = 404, description = "Leave request not found")
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    let sql = format!("SELECT {} FROM leave_requests WHERE id = ?", LEAVE_COLUMNS);
    let leave = sqlx::query_as::<_, LeaveRecord>(&sql)
        .bind(leave_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, leave_id, "Failed to fetch leave request");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    match leave {
        Some(data) => Ok(HttpResponse::Ok().json(data)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Leave request not found"
        }))),
    }
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse)
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    // -------------------------
    // Pagination
    // -------------------------
    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(code) = query.employee_code.as_deref() {
        where_sql.push_str(" AND employee_code = ?");
        args.push(FilterValue::Str(code));
    }

    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM leave_requests{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error=%e, "Failed to count leave requests");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        "SELECT {} FROM leave_requests{} ORDER BY applied_at DESC LIMIT ? OFFSET ?",
        LEAVE_COLUMNS, where_sql
    );

    let mut data_q = sqlx::query_as::<_, LeaveRecord>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::Str(s) => data_q.bind(s),
        };
    }

    let leaves = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error=%e, "Failed to fetch leave list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    // -------------------------
    // Response
    // -------------------------
    let response = LeaveListResponse {
        data: leaves,
        page: page as u32,
        per_page: per_page as u32,
        total,
    };

    Ok(HttpResponse::Ok().json(response))
}
