//! In-memory store used by the test suite and local experiments. A single
//! async mutex serializes transactions, which gives the strongest isolation
//! the engine can ask for; rollback restores a snapshot taken at `begin`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::{Mutex, MutexGuard};

use super::error::LeaveError;
use super::store::{EmployeeRow, LeaveStore, LeaveTx, LeaveRow, NewLeave, Notification};
use super::types::{LeaveStatus, LeaveType};
use super::validation::ranges_overlap;

#[derive(Debug, Default, Clone)]
struct MemData {
    employees: HashMap<String, EmployeeRow>,
    leaves: BTreeMap<u64, LeaveRow>,
    next_id: u64,
}

#[derive(Clone, Default)]
pub struct MemStore {
    data: Arc<Mutex<MemData>>,
    notices: Arc<std::sync::Mutex<Vec<Notification>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_employee(&self, employee: EmployeeRow) {
        let mut data = self.data.lock().await;
        data.employees
            .insert(employee.employee_code.clone(), employee);
    }

    /// Seed a fully-formed leave row, e.g. an already-approved request with a
    /// back-dated approval timestamp.
    pub async fn put_leave(&self, leave: LeaveRow) {
        let mut data = self.data.lock().await;
        data.next_id = data.next_id.max(leave.id + 1);
        data.leaves.insert(leave.id, leave);
    }

    pub async fn employee(&self, code: &str) -> Option<EmployeeRow> {
        self.data.lock().await.employees.get(code).cloned()
    }

    pub async fn leave(&self, id: u64) -> Option<LeaveRow> {
        self.data.lock().await.leaves.get(&id).cloned()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notices.lock().unwrap().clone()
    }
}

pub struct MemTx<'a> {
    guard: MutexGuard<'a, MemData>,
    snapshot: Option<MemData>,
    committed: bool,
}

impl Drop for MemTx<'_> {
    fn drop(&mut self) {
        if !self.committed {
            if let Some(snapshot) = self.snapshot.take() {
                *self.guard = snapshot;
            }
        }
    }
}

impl LeaveStore for MemStore {
    type Tx<'a>
        = MemTx<'a>
    where
        Self: 'a;

    async fn begin(&self) -> Result<MemTx<'_>, LeaveError> {
        let guard = self.data.lock().await;
        let snapshot = Some(guard.clone());
        Ok(MemTx {
            guard,
            snapshot,
            committed: false,
        })
    }

    async fn employee_codes(&self) -> Result<Vec<String>, LeaveError> {
        Ok(self.data.lock().await.employees.keys().cloned().collect())
    }

    async fn notify(&self, note: Notification) -> Result<(), LeaveError> {
        self.notices.lock().unwrap().push(note);
        Ok(())
    }
}

impl LeaveTx for MemTx<'_> {
    async fn employee_for_update(
        &mut self,
        code: &str,
    ) -> Result<Option<EmployeeRow>, LeaveError> {
        Ok(self.guard.employees.get(code).cloned())
    }

    async fn leave_for_update(&mut self, id: u64) -> Result<Option<LeaveRow>, LeaveError> {
        Ok(self.guard.leaves.get(&id).cloned())
    }

    async fn insert_leave(&mut self, leave: &NewLeave) -> Result<u64, LeaveError> {
        self.guard.next_id += 1;
        let id = self.guard.next_id;
        self.guard.leaves.insert(id, leave.clone().into_row(id));
        Ok(id)
    }

    async fn update_leave(&mut self, leave: &LeaveRow) -> Result<(), LeaveError> {
        if !self.guard.leaves.contains_key(&leave.id) {
            return Err(LeaveError::NotFound("leave request"));
        }
        self.guard.leaves.insert(leave.id, leave.clone());
        Ok(())
    }

    async fn set_balance(
        &mut self,
        code: &str,
        kind: LeaveType,
        value: i64,
    ) -> Result<(), LeaveError> {
        let employee = self
            .guard
            .employees
            .get_mut(code)
            .ok_or(LeaveError::NotFound("employee"))?;
        match kind {
            LeaveType::Cl => employee.cl_balance = value,
            LeaveType::Rh => employee.rh_balance = value,
            LeaveType::El => employee.el_balance = value,
        }
        Ok(())
    }

    async fn balance(&mut self, code: &str, kind: LeaveType) -> Result<i64, LeaveError> {
        self.guard
            .employees
            .get(code)
            .map(|e| e.raw_balance(kind))
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
        Ok(self.guard.leaves.values().any(|leave| {
            leave.employee_code == code
                && Some(leave.id) != exclude_leave
                && statuses.contains(&leave.status)
                && ranges_overlap(leave.from_date, leave.to_date, from_date, to_date)
        }))
    }

    async fn commit(mut self) -> Result<(), LeaveError> {
        self.committed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn employee(code: &str) -> EmployeeRow {
        EmployeeRow {
            employee_code: code.to_string(),
            name: "Test Person".to_string(),
            designation: Some("Engineer".to_string()),
            cl_balance: 10,
            rh_balance: 5,
            el_balance: 18,
        }
    }

    #[actix_web::test]
    async fn dropped_transaction_rolls_back() {
        let store = MemStore::new();
        store.put_employee(employee("EMP100")).await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.set_balance("EMP100", LeaveType::Cl, 1).await.unwrap();
            // dropped without commit
        }
        assert_eq!(store.employee("EMP100").await.unwrap().cl_balance, 10);

        let mut tx = store.begin().await.unwrap();
        tx.set_balance("EMP100", LeaveType::Cl, 1).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.employee("EMP100").await.unwrap().cl_balance, 1);
    }

    #[actix_web::test]
    async fn insert_assigns_monotonic_ids() {
        let store = MemStore::new();
        let new = NewLeave {
            employee_code: "EMP100".to_string(),
            leave_type: LeaveType::Cl,
            from_date: Utc::now().date_naive(),
            to_date: Utc::now().date_naive(),
            days: 1,
            reason: String::new(),
            location: None,
            applied_at: Utc::now(),
        };
        let mut tx = store.begin().await.unwrap();
        let a = tx.insert_leave(&new).await.unwrap();
        let b = tx.insert_leave(&new).await.unwrap();
        tx.commit().await.unwrap();
        assert!(b > a);
        assert_eq!(store.leave(b).await.unwrap().status, LeaveStatus::Pending);
    }
}
