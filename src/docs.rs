use crate::api::leave::{
    CancelRequestDto, LeaveFilter, LeaveListResponse, ReasonDto, RemarksDto, SelfCancelDto,
    SubmitLeaveDto,
};
use crate::engine::types::{CancelStatus, LeaveStatus, LeaveType};
use crate::model::employee::Employee;
use crate::model::leave_request::LeaveRecord;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Management API",
        version = "1.0.0",
        description = r#"
## Employee Leave Management

This API powers the leave-balance lifecycle engine: employees submit leave
requests against typed balances, administrators approve/reject/cancel them,
and balances are adjusted atomically.

### 🔹 Key Features
- **Leave Requests**
  - Submit against casual (CL), restricted holiday (RH) or earned (EL) balances
  - Overlap detection against pending and approved leave
- **Approval Workflow**
  - Approve (deducts balance once), reject, administrative cancel
  - Cancellation sub-requests with admin approval
  - Employee self-cancel within 48 hours of approval
- **Balances**
  - Per-employee, per-type counters, never negative
  - On-demand repair sweep clamping out-of-bound values

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave::leave_list,
        crate::api::leave::get_leave,
        crate::api::leave::submit_leave,
        crate::api::leave::approve_leave,
        crate::api::leave::reject_leave,
        crate::api::leave::cancel_leave,
        crate::api::leave::request_cancel,
        crate::api::leave::approve_cancel,
        crate::api::leave::reject_cancel,
        crate::api::leave::self_cancel,
        crate::api::leave::get_balances,
        crate::api::leave::repair_balances
    ),
    components(
        schemas(
            SubmitLeaveDto,
            RemarksDto,
            CancelRequestDto,
            ReasonDto,
            SelfCancelDto,
            LeaveFilter,
            LeaveRecord,
            LeaveListResponse,
            Employee,
            LeaveType,
            LeaveStatus,
            CancelStatus
        )
    ),
    tags(
        (name = "Leave", description = "Leave request lifecycle APIs"),
        (name = "Balance", description = "Balance inspection and repair APIs"),
    )
)]
pub struct ApiDoc;
