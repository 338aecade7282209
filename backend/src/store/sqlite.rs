use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::models::category::Category;
use crate::models::expense::{Expense, NewExpense, Source};
use crate::models::user::{Tier, User};
use crate::quota::QuotaDecision;

/// SQLite-backed store for users and expenses.
///
/// One connection behind a mutex; the quota admission path relies on its
/// statements running under a single lock acquisition.
pub struct ExpenseStore {
    conn: Mutex<Connection>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("User not found: {0}")]
    UserNotFound(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

fn parse_timestamp(raw: &str, fallback: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(fallback)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let now = Utc::now();
    let tier: String = row.get(2)?;
    let reset: Option<String> = row.get(4)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        tier: Tier::from_str_lossy(&tier),
        monthly_upload_count: row.get(3)?,
        monthly_upload_reset_date: reset.map(|r| parse_timestamp(&r, now)),
        has_annual_report: row.get::<_, i32>(5)? != 0,
        billing_customer_id: row.get(6)?,
        billing_subscription_id: row.get(7)?,
        created_at: parse_timestamp(&created_at, now),
        updated_at: parse_timestamp(&updated_at, now),
    })
}

const USER_COLUMNS: &str = "id, email, tier, monthly_upload_count, monthly_upload_reset_date, \
     has_annual_report, billing_customer_id, billing_subscription_id, created_at, updated_at";

fn expense_from_row(row: &Row<'_>) -> rusqlite::Result<Expense> {
    let now = Utc::now();
    let date: String = row.get(3)?;
    let category: String = row.get(4)?;
    let source: String = row.get(6)?;
    let created_at: String = row.get(7)?;
    Ok(Expense {
        id: row.get(0)?,
        user_id: row.get(1)?,
        amount_cents: row.get(2)?,
        date: parse_timestamp(&date, now),
        category: Category::from_label(&category),
        description: row.get(5)?,
        source: Source::from_str_lossy(&source),
        roast: row.get(8)?,
        created_at: parse_timestamp(&created_at, now),
    })
}

const EXPENSE_COLUMNS: &str =
    "id, user_id, amount_cents, date, category, description, source, created_at, roast";

impl ExpenseStore {
    pub fn new(database_url: &str) -> Result<Self, StoreError> {
        // Parse sqlite: prefix if present
        let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

        // Create parent directories if needed
        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::IoError(e.to_string()))?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT,
                tier TEXT NOT NULL DEFAULT 'free',
                monthly_upload_count INTEGER NOT NULL DEFAULT 0,
                monthly_upload_reset_date TEXT,
                has_annual_report INTEGER NOT NULL DEFAULT 0,
                billing_customer_id TEXT,
                billing_subscription_id TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS expenses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                amount_cents INTEGER NOT NULL,
                date TEXT NOT NULL,
                category TEXT NOT NULL,
                description TEXT NOT NULL,
                source TEXT NOT NULL,
                created_at TEXT NOT NULL,
                roast TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_expenses_user_id ON expenses(user_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_expenses_user_date ON expenses(user_id, date)",
            [],
        )?;

        tracing::info!("Expense store initialized with database: {}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))
    }

    /// Find or create a user. Profile sync touches email and updated_at only;
    /// tier, quota, entitlement and billing ids survive every sign-in.
    pub fn find_or_create_user(
        &self,
        user_id: &str,
        email: Option<&str>,
    ) -> Result<User, StoreError> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();

        let existed: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
            params![user_id],
            |row| row.get(0),
        )?;

        conn.execute(
            "INSERT INTO users (id, email, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(id) DO UPDATE SET
                 email = COALESCE(excluded.email, users.email),
                 updated_at = excluded.updated_at",
            params![user_id, email, now],
        )?;
        if !existed {
            tracing::info!("Created new user: {} ({})", user_id, email.unwrap_or("no email"));
        }

        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![user_id],
            user_from_row,
        )
        .map_err(StoreError::from)
    }

    pub fn get_user(&self, user_id: &str) -> Result<User, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![user_id],
            user_from_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::UserNotFound(user_id.to_string()),
            other => other.into(),
        })
    }

    /// Evaluate and consume one upload admission.
    ///
    /// Runs under one lock acquisition so two concurrent uploads cannot both
    /// read the same stale counter:
    /// 1. zero the counter when the reset date is missing or in a prior
    ///    calendar month (RFC 3339 text makes substr(..,1,7) the month key);
    /// 2. conditionally increment: unconditional for premium, bounded by the
    ///    free limit otherwise. changes() == 1 means admitted.
    pub fn admit_upload(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        free_limit: i64,
    ) -> Result<QuotaDecision, StoreError> {
        let conn = self.lock()?;
        let now = now.to_rfc3339();

        conn.execute(
            "UPDATE users SET monthly_upload_count = 0, monthly_upload_reset_date = ?2
             WHERE id = ?1
               AND (monthly_upload_reset_date IS NULL
                    OR substr(monthly_upload_reset_date, 1, 7) != substr(?2, 1, 7))",
            params![user_id, now],
        )?;

        let admitted = conn.execute(
            "UPDATE users SET monthly_upload_count = monthly_upload_count + 1, updated_at = ?2
             WHERE id = ?1 AND (tier != 'free' OR monthly_upload_count < ?3)",
            params![user_id, now, free_limit],
        )? == 1;

        let (tier, count): (String, i64) = conn.query_row(
            "SELECT tier, monthly_upload_count FROM users WHERE id = ?1",
            params![user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let limit = match Tier::from_str_lossy(&tier) {
            Tier::Free => Some(free_limit),
            Tier::Premium => None,
        };
        Ok(QuotaDecision {
            admitted,
            uploads_used: count,
            uploads_limit: limit,
        })
    }

    pub fn create_expense(&self, new: &NewExpense) -> Result<Expense, StoreError> {
        let conn = self.lock()?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO expenses (user_id, amount_cents, date, category, description, source, created_at, roast)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                new.user_id,
                new.amount_cents,
                new.date.to_rfc3339(),
                new.category.as_str(),
                new.description,
                new.source.as_str(),
                now.to_rfc3339(),
                new.roast,
            ],
        )?;
        let id = conn.last_insert_rowid();

        Ok(Expense {
            id,
            user_id: new.user_id.clone(),
            amount_cents: new.amount_cents,
            description: new.description.clone(),
            date: new.date,
            category: new.category,
            roast: new.roast.clone(),
            source: new.source,
            created_at: now,
        })
    }

    /// All of a user's expenses, most recent transaction first.
    pub fn list_expenses(&self, user_id: &str) -> Result<Vec<Expense>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE user_id = ?1 ORDER BY date DESC, id DESC"
        ))?;
        let rows = stmt.query_map(params![user_id], expense_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }

    pub fn count_expenses(&self, user_id: &str) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT COUNT(*) FROM expenses WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .map_err(StoreError::from)
    }

    /// Delete scoped by owner. Someone else's id matches zero rows, which is
    /// indistinguishable from deleting a row that never existed.
    pub fn delete_expense(&self, id: i64, user_id: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM expenses WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(())
    }

    /// Billing reconcile: premium activated.
    pub fn activate_subscription(
        &self,
        user_id: &str,
        customer_id: Option<&str>,
        subscription_id: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE users SET tier = 'premium',
                 billing_customer_id = COALESCE(?2, billing_customer_id),
                 billing_subscription_id = COALESCE(?3, billing_subscription_id),
                 updated_at = ?4
             WHERE id = ?1",
            params![user_id, customer_id, subscription_id, now],
        )?;
        Ok(())
    }

    /// Billing reconcile: subscription ended. Billing ids are retained for
    /// later reconciliation by the collaborator.
    pub fn cancel_subscription(&self, user_id: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE users SET tier = 'free', updated_at = ?2 WHERE id = ?1",
            params![user_id, now],
        )?;
        Ok(())
    }

    /// Billing reconcile: one-time annual report purchased.
    pub fn grant_annual_report(&self, user_id: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE users SET has_annual_report = 1, updated_at = ?2 WHERE id = ?1",
            params![user_id, now],
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub fn set_tier(&self, user_id: &str, tier: Tier) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE users SET tier = ?2 WHERE id = ?1",
            params![user_id, tier.as_str()],
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub fn set_upload_state(
        &self,
        user_id: &str,
        count: i64,
        reset_date: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE users SET monthly_upload_count = ?2, monthly_upload_reset_date = ?3 WHERE id = ?1",
            params![user_id, count, reset_date.map(|d| d.to_rfc3339())],
        )?;
        Ok(())
    }
}
