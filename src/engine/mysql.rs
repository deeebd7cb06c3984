//! Production store backed by MySQL through sqlx. All mutating transitions
//! run inside one `Transaction`; the employee and leave rows are read with
//! `FOR UPDATE` so concurrent transitions on the same employee serialize at
//! the row lock instead of racing.

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{MySql, MySqlPool, Transaction};

use super::error::LeaveError;
use super::store::{EmployeeRow, LeaveRow, LeaveStore, LeaveTx, NewLeave, Notification};
use super::types::{LeaveStatus, LeaveType};

const LEAVE_COLUMNS: &str = "id, employee_code, leave_type, from_date, to_date, days, reason, \
     location, status, applied_at, approved_at, rejected_at, cancelled_at, remarks, \
     cancel_status, cancel_reason";

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

pub struct MySqlTx {
    tx: Transaction<'static, MySql>,
}

/// Raw shape of a leave_requests row; enum columns come back as strings and
/// are parsed on the way out.
#[derive(sqlx::FromRow)]
struct LeaveSqlRow {
    id: u64,
    employee_code: String,
    leave_type: String,
    from_date: NaiveDate,
    to_date: NaiveDate,
    days: i64,
    reason: String,
    location: Option<String>,
    status: String,
    applied_at: DateTime<Utc>,
    approved_at: Option<DateTime<Utc>>,
    rejected_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    remarks: Option<String>,
    cancel_status: String,
    cancel_reason: Option<String>,
}

impl TryFrom<LeaveSqlRow> for LeaveRow {
    type Error = LeaveError;

    fn try_from(row: LeaveSqlRow) -> Result<Self, LeaveError> {
        let leave_type = row
            .leave_type
            .parse()
            .map_err(|_| LeaveError::Storage(anyhow!("bad leave_type '{}'", row.leave_type)))?;
        let status = row
            .status
            .parse()
            .map_err(|_| LeaveError::Storage(anyhow!("bad status '{}'", row.status)))?;
        let cancel_status = row.cancel_status.parse().map_err(|_| {
            LeaveError::Storage(anyhow!("bad cancel_status '{}'", row.cancel_status))
        })?;
        Ok(LeaveRow {
            id: row.id,
            employee_code: row.employee_code,
            leave_type,
            from_date: row.from_date,
            to_date: row.to_date,
            days: row.days,
            reason: row.reason,
            location: row.location,
            status,
            applied_at: row.applied_at,
            approved_at: row.approved_at,
            rejected_at: row.rejected_at,
            cancelled_at: row.cancelled_at,
            remarks: row.remarks,
            cancel_status,
            cancel_reason: row.cancel_reason,
        })
    }
}

impl LeaveStore for MySqlStore {
    type Tx<'a>
        = MySqlTx
    where
        Self: 'a;

    async fn begin(&self) -> Result<MySqlTx, LeaveError> {
        let tx = self.pool.begin().await?;
        Ok(MySqlTx { tx })
    }

    async fn employee_codes(&self) -> Result<Vec<String>, LeaveError> {
        let codes = sqlx::query_scalar::<_, String>("SELECT employee_code FROM employees")
            .fetch_all(&self.pool)
            .await?;
        Ok(codes)
    }

    async fn notify(&self, note: Notification) -> Result<(), LeaveError> {
        sqlx::query(
            "INSERT INTO notifications (recipient, event, message, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&note.recipient)
        .bind(note.event)
        .bind(&note.message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl LeaveTx for MySqlTx {
    async fn employee_for_update(
        &mut self,
        code: &str,
    ) -> Result<Option<EmployeeRow>, LeaveError> {
        let employee = sqlx::query_as::<_, EmployeeRow>(
            "SELECT employee_code, name, designation, cl_balance, rh_balance, el_balance \
             FROM employees WHERE employee_code = ? FOR UPDATE",
        )
        .bind(code)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(employee)
    }

    async fn leave_for_update(&mut self, id: u64) -> Result<Option<LeaveRow>, LeaveError> {
        let sql = format!(
            "SELECT {} FROM leave_requests WHERE id = ? FOR UPDATE",
            LEAVE_COLUMNS
        );
        let row = sqlx::query_as::<_, LeaveSqlRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(LeaveRow::try_from).transpose()
    }

    async fn insert_leave(&mut self, leave: &NewLeave) -> Result<u64, LeaveError> {
        let result = sqlx::query(
            "INSERT INTO leave_requests \
             (employee_code, leave_type, from_date, to_date, days, reason, location, \
              status, applied_at, cancel_status) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', ?, 'none')",
        )
        .bind(&leave.employee_code)
        .bind(leave.leave_type.to_string())
        .bind(leave.from_date)
        .bind(leave.to_date)
        .bind(leave.days)
        .bind(&leave.reason)
        .bind(&leave.location)
        .bind(leave.applied_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn update_leave(&mut self, leave: &LeaveRow) -> Result<(), LeaveError> {
        let result = sqlx::query(
            "UPDATE leave_requests SET \
             status = ?, approved_at = ?, rejected_at = ?, cancelled_at = ?, remarks = ?, \
             cancel_status = ?, cancel_reason = ?, days = ? \
             WHERE id = ?",
        )
        .bind(leave.status.to_string())
        .bind(leave.approved_at)
        .bind(leave.rejected_at)
        .bind(leave.cancelled_at)
        .bind(&leave.remarks)
        .bind(leave.cancel_status.to_string())
        .bind(&leave.cancel_reason)
        .bind(leave.days)
        .bind(leave.id)
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(LeaveError::NotFound("leave request"));
        }
        Ok(())
    }

    async fn set_balance(
        &mut self,
        code: &str,
        kind: LeaveType,
        value: i64,
    ) -> Result<(), LeaveError> {
        // Column name comes from a fixed enum mapping, never from input.
        let sql = format!(
            "UPDATE employees SET {} = ? WHERE employee_code = ?",
            kind.balance_column()
        );
        let result = sqlx::query(&sql)
            .bind(value)
            .bind(code)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(LeaveError::NotFound("employee"));
        }
        Ok(())
    }

    async fn balance(&mut self, code: &str, kind: LeaveType) -> Result<i64, LeaveError> {
        let sql = format!(
            "SELECT {} FROM employees WHERE employee_code = ?",
            kind.balance_column()
        );
        sqlx::query_scalar::<_, i64>(&sql)
            .bind(code)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or(LeaveError::NotFound("employee"))
    }

    async fn overlap_exists(
        &mut self,
        code: &str,
        from_date: NaiveDate,
        to_date: NaiveDate,
        statuses: &[LeaveStatus],
        exclude_leave: Option<u64>,
    ) -> Result<bool, LeaveError> {
        if statuses.is_empty() {
            return Ok(false);
        }
        let placeholders = vec!["?"; statuses.len()].join(", ");
        let mut sql = format!(
            "SELECT COUNT(*) FROM leave_requests \
             WHERE employee_code = ? AND status IN ({}) \
             AND from_date <= ? AND to_date >= ?",
            placeholders
        );
        if exclude_leave.is_some() {
            sql.push_str(" AND id <> ?");
        }

        let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(code);
        for status in statuses {
            query = query.bind(status.to_string());
        }
        query = query.bind(to_date).bind(from_date);
        if let Some(id) = exclude_leave {
            query = query.bind(id);
        }

        let count = query.fetch_one(&mut *self.tx).await?;
        Ok(count > 0)
    }

    async fn commit(self) -> Result<(), LeaveError> {
        self.tx.commit().await?;
        Ok(())
    }
}
