pub mod sqlite;

pub use sqlite::{ExpenseStore, StoreError};
