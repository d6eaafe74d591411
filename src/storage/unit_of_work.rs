use std::future::Future;
use std::pin::Pin;

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Row, Sqlite};

use crate::domain::{
    Account, AccountId, CategoryId, Cents, Transaction, TransactionId, TransactionItem,
    WasteCategory, WithdrawalRequest, WithdrawalRequestId,
};

use super::queries::{self, REQUEST_COLUMNS, timestamp};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Transactional handle handed to a unit of work.
///
/// The underlying SQLite transaction was opened with `BEGIN IMMEDIATE`, so the
/// write lock is held from the first read: a balance read here cannot go stale
/// before the matching write. Nothing is visible to other connections until
/// the runner commits; dropping the handle rolls everything back.
pub struct UnitOfWork {
    pub(super) tx: sqlx::Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    // ========================
    // Accounts
    // ========================

    pub async fn account(&mut self, id: AccountId) -> Result<Option<Account>> {
        queries::fetch_account(&mut *self.tx, id).await
    }

    /// Current balance, or None when the account doesn't exist.
    pub async fn read_balance(&mut self, id: AccountId) -> Result<Option<Cents>> {
        let row = sqlx::query("SELECT balance FROM accounts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to read balance")?;

        Ok(row.map(|r| r.get("balance")))
    }

    /// Add `delta` to the stored balance and return the new value.
    /// Callers check the non-negative invariant first; the schema CHECK is a backstop.
    pub async fn adjust_balance(&mut self, id: AccountId, delta: Cents) -> Result<Cents> {
        let row = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = balance + ?, updated_at = ?
            WHERE id = ?
            RETURNING balance
            "#,
        )
        .bind(delta)
        .bind(timestamp(Utc::now()))
        .bind(id.to_string())
        .fetch_optional(&mut *self.tx)
        .await
        .context("Failed to adjust balance")?;

        row.map(|r| r.get("balance"))
            .ok_or_else(|| anyhow::anyhow!("Account {} disappeared during balance update", id))
    }

    // ========================
    // Catalog
    // ========================

    pub async fn category(&mut self, id: CategoryId) -> Result<Option<WasteCategory>> {
        queries::fetch_category(&mut *self.tx, id).await
    }

    // ========================
    // Transactions and items
    // ========================

    pub async fn transaction(&mut self, id: TransactionId) -> Result<Option<Transaction>> {
        queries::fetch_transaction(&mut *self.tx, id).await
    }

    pub async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, account_id, transaction_type, total_amount, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(transaction.id.to_string())
        .bind(transaction.account_id.to_string())
        .bind(transaction.transaction_type.as_str())
        .bind(transaction.total_amount)
        .bind(&transaction.description)
        .bind(timestamp(transaction.created_at))
        .bind(timestamp(transaction.updated_at))
        .execute(&mut *self.tx)
        .await
        .context("Failed to save transaction")?;
        Ok(())
    }

    /// Persist description, total and updated_at of an existing transaction.
    pub async fn update_transaction(&mut self, transaction: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE transactions
            SET total_amount = ?, description = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(transaction.total_amount)
        .bind(&transaction.description)
        .bind(timestamp(transaction.updated_at))
        .bind(transaction.id.to_string())
        .execute(&mut *self.tx)
        .await
        .context("Failed to update transaction")?;
        Ok(())
    }

    pub async fn delete_transaction(&mut self, id: TransactionId) -> Result<()> {
        sqlx::query("DELETE FROM transactions WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *self.tx)
            .await
            .context("Failed to delete transaction")?;
        Ok(())
    }

    pub async fn items(&mut self, transaction_id: TransactionId) -> Result<Vec<TransactionItem>> {
        queries::fetch_items(&mut *self.tx, transaction_id).await
    }

    pub async fn insert_items(&mut self, items: &[TransactionItem]) -> Result<()> {
        for item in items {
            sqlx::query(
                r#"
                INSERT INTO transaction_items (id, transaction_id, waste_category_id, weight_grams, subtotal)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(item.id.to_string())
            .bind(item.transaction_id.to_string())
            .bind(item.waste_category_id)
            .bind(item.weight_grams)
            .bind(item.subtotal)
            .execute(&mut *self.tx)
            .await
            .context("Failed to save transaction item")?;
        }
        Ok(())
    }

    /// Remove every item of a transaction; returns how many were removed.
    pub async fn delete_items(&mut self, transaction_id: TransactionId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM transaction_items WHERE transaction_id = ?")
            .bind(transaction_id.to_string())
            .execute(&mut *self.tx)
            .await
            .context("Failed to delete transaction items")?;
        Ok(result.rows_affected())
    }

    // ========================
    // Withdrawal requests
    // ========================

    pub async fn request(&mut self, id: WithdrawalRequestId) -> Result<Option<WithdrawalRequest>> {
        queries::fetch_request(&mut *self.tx, id).await
    }

    pub async fn pending_request(
        &mut self,
        account_id: AccountId,
    ) -> Result<Option<WithdrawalRequest>> {
        let query = format!(
            "SELECT {} FROM withdrawal_requests WHERE account_id = ? AND status = 'pending' LIMIT 1",
            REQUEST_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(account_id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to look up pending request")?;

        row.as_ref().map(queries::row_to_request).transpose()
    }

    /// The request whose approval produced this transaction, if any.
    pub async fn request_for_transaction(
        &mut self,
        transaction_id: TransactionId,
    ) -> Result<Option<WithdrawalRequest>> {
        let query = format!(
            "SELECT {} FROM withdrawal_requests WHERE transaction_id = ?",
            REQUEST_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(transaction_id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to look up request for transaction")?;

        row.as_ref().map(queries::row_to_request).transpose()
    }

    pub async fn insert_request(&mut self, request: &WithdrawalRequest) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO withdrawal_requests (id, account_id, amount, description, status, admin_id, admin_note, transaction_id, requested_at, processed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.id.to_string())
        .bind(request.account_id.to_string())
        .bind(request.amount)
        .bind(&request.description)
        .bind(request.status.as_str())
        .bind(request.admin_id.map(|id| id.to_string()))
        .bind(&request.admin_note)
        .bind(request.transaction_id.map(|id| id.to_string()))
        .bind(timestamp(request.requested_at))
        .bind(request.processed_at.map(timestamp))
        .execute(&mut *self.tx)
        .await
        .context("Failed to save withdrawal request")?;
        Ok(())
    }

    /// Persist the workflow fields of a request.
    pub async fn update_request(&mut self, request: &WithdrawalRequest) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE withdrawal_requests
            SET status = ?, admin_id = ?, admin_note = ?, transaction_id = ?, processed_at = ?
            WHERE id = ?
            "#,
        )
        .bind(request.status.as_str())
        .bind(request.admin_id.map(|id| id.to_string()))
        .bind(&request.admin_note)
        .bind(request.transaction_id.map(|id| id.to_string()))
        .bind(request.processed_at.map(timestamp))
        .bind(request.id.to_string())
        .execute(&mut *self.tx)
        .await
        .context("Failed to update withdrawal request")?;
        Ok(())
    }
}
