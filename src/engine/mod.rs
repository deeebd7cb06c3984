//! The leave-balance lifecycle engine: typed balances, the leave request
//! ledger, pure validation, and the atomic transition operations that keep
//! the two consistent.

pub mod error;
pub mod memory;
pub mod mysql;
pub mod store;
pub mod transitions;
pub mod types;
pub mod validation;

pub use error::LeaveError;
pub use memory::MemStore;
pub use mysql::MySqlStore;
pub use store::{EmployeeRow, LeaveRow, LeaveStore, LeaveTx, NewLeave, Notification};
pub use transitions::{
    BalanceChange, LeaveEngine, RepairReport, SubmitLeave, TransitionOutcome,
};
pub use types::{CancelStatus, LeaveStatus, LeaveType};
