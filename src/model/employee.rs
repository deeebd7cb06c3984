use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "employee_code": "EMP001",
        "name": "John Doe",
        "designation": "Software Engineer",
        "cl_balance": 30,
        "rh_balance": 15,
        "el_balance": 18
    })
)]
pub struct Employee {
    #[schema(example = "EMP001")]
    pub employee_code: String,

    #[schema(example = "John Doe")]
    pub name: String,

    #[schema(example = "Software Engineer", nullable = true)]
    pub designation: Option<String>,

    /// Remaining casual leave days
    #[schema(example = 30)]
    pub cl_balance: i64,

    /// Remaining restricted holiday days
    #[schema(example = 15)]
    pub rh_balance: i64,

    /// Remaining earned leave days
    #[schema(example = 18)]
    pub el_balance: i64,
}
