use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Leave request row as served by the read endpoints. Enum columns come back
/// as their stored string codes.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRecord {
    #[schema(example = 1)]
    pub id: u64,
    /// employee the leave is applied for
    #[schema(example = "EMP001")]
    pub employee_code: String,
    #[schema(example = "EL", value_type = String)]
    pub leave_type: String,
    #[schema(example = "2025-03-10", format = "date", value_type = String)]
    pub from_date: NaiveDate,
    #[schema(example = "2025-03-12", format = "date", value_type = String)]
    pub to_date: NaiveDate,
    /// inclusive day count, fixed at submission
    #[schema(example = 3)]
    pub days: i64,
    pub reason: String,
    #[schema(nullable = true)]
    pub location: Option<String>,
    #[schema(example = "pending", value_type = String)]
    pub status: String,
    #[schema(example = "2025-03-01T00:00:00Z", format = "date-time", value_type = String)]
    pub applied_at: DateTime<Utc>,
    #[schema(nullable = true, format = "date-time", value_type = Option<String>)]
    pub approved_at: Option<DateTime<Utc>>,
    #[schema(nullable = true, format = "date-time", value_type = Option<String>)]
    pub rejected_at: Option<DateTime<Utc>>,
    #[schema(nullable = true, format = "date-time", value_type = Option<String>)]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[schema(nullable = true)]
    pub remarks: Option<String>,
    #[schema(example = "none", value_type = String)]
    pub cancel_status: String,
    #[schema(nullable = true)]
    pub cancel_reason: Option<String>,
}
