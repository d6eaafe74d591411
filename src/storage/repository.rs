use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};

use crate::domain::{
    Account, AccountId, CategoryId, Cents, Grams, Transaction, TransactionId, TransactionItem,
    TransactionType, WasteCategory, WithdrawalRequest, WithdrawalRequestId, WithdrawalStatus,
};

use super::MIGRATION_001_INITIAL;
use super::queries::{
    self, ACCOUNT_COLUMNS, CATEGORY_COLUMNS, ITEM_COLUMNS, REQUEST_COLUMNS, TRANSACTION_COLUMNS,
    timestamp,
};
use super::unit_of_work::{BoxFuture, UnitOfWork};

/// Connection settings for the SQLite store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// How long a writer waits for the database lock before failing
    pub busy_timeout: Duration,
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            max_connections: 8,
        }
    }
}

/// Per-type totals for one account's ledger.
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerTotals {
    pub deposit_count: i64,
    pub deposit_total: Cents,
    pub withdrawal_count: i64,
    pub withdrawal_total: Cents,
    pub deposited_weight: Grams,
}

/// Deposited weight and earnings for one waste category.
#[derive(Debug, Clone)]
pub struct CategoryAggregate {
    pub category_id: CategoryId,
    pub category_name: String,
    pub item_count: i64,
    pub weight: Grams,
    pub earned: Cents,
}

/// Count and amount of withdrawal requests in one status.
#[derive(Debug, Clone, Copy)]
pub struct StatusAggregate {
    pub status: WithdrawalStatus,
    pub count: i64,
    pub total_amount: Cents,
}

/// Store state read in one snapshot for reconciliation.
#[derive(Debug, Clone)]
pub struct IntegritySnapshot {
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
    pub pending_counts: HashMap<AccountId, i64>,
    /// (transaction id, stored total, items total) for deposits that disagree
    pub deposit_mismatches: Vec<(TransactionId, Cents, Cents)>,
}

/// Repository for persisting and querying accounts, the catalog, the ledger
/// and withdrawal requests. Reads go straight to the pool; anything that
/// changes a balance goes through [`Repository::unit_of_work`].
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL.
    pub async fn connect(database_url: &str, config: &StoreConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str, config: &StoreConfig) -> Result<Self> {
        let repo = Self::connect(database_url, config).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Run `work` as one atomic unit: commit if it returns Ok, roll back otherwise.
    ///
    /// The unit starts with `BEGIN IMMEDIATE`, taking SQLite's write lock up
    /// front. Concurrent units queue on the busy timeout instead of racing on
    /// stale reads.
    pub async fn unit_of_work<T, E, F>(&self, work: F) -> std::result::Result<T, E>
    where
        F: for<'u> FnOnce(&'u mut UnitOfWork) -> BoxFuture<'u, std::result::Result<T, E>>,
        E: From<anyhow::Error>,
    {
        let tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .context("Failed to begin unit of work")?;
        let mut uow = UnitOfWork { tx };
        debug!("unit of work started");

        let outcome = work(&mut uow).await;
        match outcome {
            Ok(value) => {
                uow.tx
                    .commit()
                    .await
                    .context("Failed to commit unit of work")?;
                debug!("unit of work committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = uow.tx.rollback().await {
                    warn!(error = %rollback_err, "rollback failed; connection will be discarded");
                }
                debug!("unit of work rolled back");
                Err(err)
            }
        }
    }

    // ========================
    // Account operations
    // ========================

    /// Save a new account. Balance starts at whatever the struct carries (zero for new accounts).
    pub async fn save_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, name, email, account_number, role, balance, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.account_number)
        .bind(account.role.as_str())
        .bind(account.balance)
        .bind(timestamp(account.created_at))
        .bind(timestamp(account.updated_at))
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;
        Ok(())
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        queries::fetch_account(&self.pool, id).await
    }

    pub async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let query = format!("SELECT {} FROM accounts WHERE email = ?", ACCOUNT_COLUMNS);
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch account by email")?;

        row.as_ref().map(queries::row_to_account).transpose()
    }

    pub async fn account_number_exists(&self, account_number: &str) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM accounts WHERE account_number = ?")
            .bind(account_number)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check account number")?;
        Ok(row.get::<i64, _>("count") > 0)
    }

    /// List all accounts, newest first.
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let query = format!(
            "SELECT {} FROM accounts ORDER BY created_at DESC",
            ACCOUNT_COLUMNS
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list accounts")?;

        rows.iter().map(queries::row_to_account).collect()
    }

    // ========================
    // Catalog operations
    // ========================

    /// Insert a category and return it with its assigned id.
    pub async fn save_category(&self, name: &str, price_per_kg: Cents) -> Result<WasteCategory> {
        let now = timestamp(Utc::now());
        let query = format!(
            "INSERT INTO waste_categories (name, price_per_kg, created_at, updated_at) VALUES (?, ?, ?, ?) RETURNING {}",
            CATEGORY_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(name)
            .bind(price_per_kg)
            .bind(&now)
            .bind(&now)
            .fetch_one(&self.pool)
            .await
            .context("Failed to save waste category")?;

        queries::row_to_category(&row)
    }

    pub async fn get_category(&self, id: CategoryId) -> Result<Option<WasteCategory>> {
        queries::fetch_category(&self.pool, id).await
    }

    pub async fn get_category_by_name(&self, name: &str) -> Result<Option<WasteCategory>> {
        let query = format!(
            "SELECT {} FROM waste_categories WHERE name = ?",
            CATEGORY_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch waste category by name")?;

        row.as_ref().map(queries::row_to_category).transpose()
    }

    pub async fn list_categories(&self) -> Result<Vec<WasteCategory>> {
        let query = format!("SELECT {} FROM waste_categories ORDER BY name", CATEGORY_COLUMNS);
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list waste categories")?;

        rows.iter().map(queries::row_to_category).collect()
    }

    /// Rename and/or reprice a category. Existing item subtotals are not touched.
    pub async fn update_category(
        &self,
        id: CategoryId,
        name: &str,
        price_per_kg: Cents,
    ) -> Result<Option<WasteCategory>> {
        let query = format!(
            "UPDATE waste_categories SET name = ?, price_per_kg = ?, updated_at = ? WHERE id = ? RETURNING {}",
            CATEGORY_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(name)
            .bind(price_per_kg)
            .bind(timestamp(Utc::now()))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to update waste category")?;

        row.as_ref().map(queries::row_to_category).transpose()
    }

    pub async fn delete_category(&self, id: CategoryId) -> Result<()> {
        sqlx::query("DELETE FROM waste_categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete waste category")?;
        Ok(())
    }

    pub async fn count_items_for_category(&self, id: CategoryId) -> Result<i64> {
        let row =
            sqlx::query("SELECT COUNT(*) as count FROM transaction_items WHERE waste_category_id = ?")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .context("Failed to count items for category")?;
        Ok(row.get("count"))
    }

    // ========================
    // Ledger reads
    // ========================

    pub async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        queries::fetch_transaction(&self.pool, id).await
    }

    pub async fn get_items(&self, transaction_id: TransactionId) -> Result<Vec<TransactionItem>> {
        queries::fetch_items(&self.pool, transaction_id).await
    }

    /// List an account's transactions, newest first.
    pub async fn list_transactions_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>> {
        let query = format!(
            "SELECT {} FROM transactions WHERE account_id = ? ORDER BY created_at DESC, id DESC",
            TRANSACTION_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(account_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions for account")?;

        rows.iter().map(queries::row_to_transaction).collect()
    }

    /// List every transaction, newest first.
    pub async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let query = format!(
            "SELECT {} FROM transactions ORDER BY created_at DESC, id DESC",
            TRANSACTION_COLUMNS
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions")?;

        rows.iter().map(queries::row_to_transaction).collect()
    }

    /// Every item belonging to one account's transactions.
    pub async fn list_items_for_account(&self, account_id: AccountId) -> Result<Vec<TransactionItem>> {
        let query = format!(
            r#"
            SELECT {}
            FROM transaction_items
            WHERE transaction_id IN (SELECT id FROM transactions WHERE account_id = ?)
            ORDER BY rowid
            "#,
            ITEM_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(account_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list items for account")?;

        rows.iter().map(queries::row_to_item).collect()
    }

    /// Every item in the store.
    pub async fn list_items(&self) -> Result<Vec<TransactionItem>> {
        let query = format!("SELECT {} FROM transaction_items ORDER BY rowid", ITEM_COLUMNS);
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list items")?;

        rows.iter().map(queries::row_to_item).collect()
    }

    /// Aggregate an account's ledger with SQL rather than loading every row.
    pub async fn ledger_totals(&self, account_id: AccountId) -> Result<LedgerTotals> {
        let account_str = account_id.to_string();
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN transaction_type = 'deposit' THEN 1 ELSE 0 END), 0) as deposit_count,
                COALESCE(SUM(CASE WHEN transaction_type = 'deposit' THEN total_amount ELSE 0 END), 0) as deposit_total,
                COALESCE(SUM(CASE WHEN transaction_type = 'withdrawal' THEN 1 ELSE 0 END), 0) as withdrawal_count,
                COALESCE(SUM(CASE WHEN transaction_type = 'withdrawal' THEN total_amount ELSE 0 END), 0) as withdrawal_total
            FROM transactions
            WHERE account_id = ?
            "#,
        )
        .bind(&account_str)
        .fetch_one(&self.pool)
        .await
        .context("Failed to aggregate ledger")?;

        let weight_row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(i.weight_grams), 0) as weight
            FROM transaction_items i
            JOIN transactions t ON t.id = i.transaction_id
            WHERE t.account_id = ? AND t.transaction_type = 'deposit'
            "#,
        )
        .bind(&account_str)
        .fetch_one(&self.pool)
        .await
        .context("Failed to aggregate deposited weight")?;

        Ok(LedgerTotals {
            deposit_count: row.get("deposit_count"),
            deposit_total: row.get("deposit_total"),
            withdrawal_count: row.get("withdrawal_count"),
            withdrawal_total: row.get("withdrawal_total"),
            deposited_weight: weight_row.get("weight"),
        })
    }

    /// Deposited weight and earnings per category for one account, highest earnings first.
    pub async fn category_aggregates(&self, account_id: AccountId) -> Result<Vec<CategoryAggregate>> {
        let rows = sqlx::query(
            r#"
            SELECT
                c.id as category_id,
                c.name as category_name,
                COUNT(i.id) as item_count,
                SUM(i.weight_grams) as weight,
                SUM(i.subtotal) as earned
            FROM transaction_items i
            JOIN transactions t ON t.id = i.transaction_id
            JOIN waste_categories c ON c.id = i.waste_category_id
            WHERE t.account_id = ?
            GROUP BY c.id, c.name
            ORDER BY earned DESC, c.name
            "#,
        )
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to aggregate categories")?;

        Ok(rows
            .iter()
            .map(|row| CategoryAggregate {
                category_id: row.get("category_id"),
                category_name: row.get("category_name"),
                item_count: row.get("item_count"),
                weight: row.get("weight"),
                earned: row.get("earned"),
            })
            .collect())
    }

    // ========================
    // Withdrawal request reads
    // ========================

    pub async fn get_request(&self, id: WithdrawalRequestId) -> Result<Option<WithdrawalRequest>> {
        queries::fetch_request(&self.pool, id).await
    }

    /// An account's requests, newest first.
    pub async fn list_requests_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<WithdrawalRequest>> {
        let query = format!(
            "SELECT {} FROM withdrawal_requests WHERE account_id = ? ORDER BY requested_at DESC",
            REQUEST_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(account_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list withdrawal requests for account")?;

        rows.iter().map(queries::row_to_request).collect()
    }

    /// All requests, optionally filtered by status. Pending first, then newest first.
    pub async fn list_requests(
        &self,
        status: Option<WithdrawalStatus>,
    ) -> Result<Vec<WithdrawalRequest>> {
        let mut query = format!("SELECT {} FROM withdrawal_requests", REQUEST_COLUMNS);
        if status.is_some() {
            query.push_str(" WHERE status = ?");
        }
        query.push_str(
            " ORDER BY CASE WHEN status = 'pending' THEN 0 ELSE 1 END, requested_at DESC",
        );

        let mut sql_query = sqlx::query(&query);
        if let Some(status) = status {
            sql_query = sql_query.bind(status.as_str());
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list withdrawal requests")?;

        rows.iter().map(queries::row_to_request).collect()
    }

    pub async fn request_stats(&self) -> Result<Vec<StatusAggregate>> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) as count, COALESCE(SUM(amount), 0) as total_amount
            FROM withdrawal_requests
            GROUP BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to aggregate withdrawal requests")?;

        rows.iter()
            .map(|row| {
                let status_str: String = row.get("status");
                Ok(StatusAggregate {
                    status: WithdrawalStatus::from_str(&status_str)
                        .ok_or_else(|| anyhow::anyhow!("Invalid request status: {}", status_str))?,
                    count: row.get("count"),
                    total_amount: row.get("total_amount"),
                })
            })
            .collect()
    }

    // ========================
    // Integrity queries
    // ========================

    /// Read everything reconciliation needs from one consistent snapshot.
    ///
    /// The reads share a single read transaction, so a write committed
    /// halfway through cannot show up in one list and not another.
    pub async fn integrity_snapshot(&self) -> Result<IntegritySnapshot> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin integrity read")?;

        let query = format!("SELECT {} FROM accounts ORDER BY created_at DESC", ACCOUNT_COLUMNS);
        let accounts = sqlx::query(&query)
            .fetch_all(&mut *tx)
            .await
            .context("Failed to list accounts")?
            .iter()
            .map(queries::row_to_account)
            .collect::<Result<Vec<_>>>()?;

        let query = format!("SELECT {} FROM transactions", TRANSACTION_COLUMNS);
        let transactions = sqlx::query(&query)
            .fetch_all(&mut *tx)
            .await
            .context("Failed to list transactions")?
            .iter()
            .map(queries::row_to_transaction)
            .collect::<Result<Vec<_>>>()?;

        let rows = sqlx::query(
            r#"
            SELECT account_id, COUNT(*) as count
            FROM withdrawal_requests
            WHERE status = ?
            GROUP BY account_id
            "#,
        )
        .bind(WithdrawalStatus::Pending.as_str())
        .fetch_all(&mut *tx)
        .await
        .context("Failed to count pending requests")?;

        let mut pending_counts = HashMap::new();
        for row in rows {
            let account_str: String = row.get("account_id");
            let account_id = uuid::Uuid::parse_str(&account_str).context("Invalid account ID")?;
            pending_counts.insert(account_id, row.get("count"));
        }

        let rows = sqlx::query(
            r#"
            SELECT t.id as id, t.total_amount as total_amount, COALESCE(SUM(i.subtotal), 0) as items_total
            FROM transactions t
            LEFT JOIN transaction_items i ON i.transaction_id = t.id
            WHERE t.transaction_type = ?
            GROUP BY t.id, t.total_amount
            HAVING t.total_amount != COALESCE(SUM(i.subtotal), 0)
            "#,
        )
        .bind(TransactionType::Deposit.as_str())
        .fetch_all(&mut *tx)
        .await
        .context("Failed to reconcile deposit totals")?;

        let deposit_mismatches = rows
            .iter()
            .map(|row| {
                let id_str: String = row.get("id");
                Ok((
                    uuid::Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
                    row.get("total_amount"),
                    row.get("items_total"),
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        tx.commit().await.context("Failed to end integrity read")?;

        Ok(IntegritySnapshot {
            accounts,
            transactions,
            pending_counts,
            deposit_mismatches,
        })
    }
}
