//! Row mapping and the lookups shared by the pooled read path and the
//! unit-of-work write path. Every function here takes any SQLite executor.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};
use uuid::Uuid;

use crate::domain::{
    Account, AccountId, CategoryId, Role, Transaction, TransactionId, TransactionItem,
    TransactionType, WasteCategory, WithdrawalRequest, WithdrawalRequestId, WithdrawalStatus,
};

pub(crate) const ACCOUNT_COLUMNS: &str =
    "id, name, email, account_number, role, balance, created_at, updated_at";
pub(crate) const CATEGORY_COLUMNS: &str = "id, name, price_per_kg, created_at, updated_at";
pub(crate) const TRANSACTION_COLUMNS: &str =
    "id, account_id, transaction_type, total_amount, description, created_at, updated_at";
pub(crate) const ITEM_COLUMNS: &str =
    "id, transaction_id, waste_category_id, weight_grams, subtotal";
pub(crate) const REQUEST_COLUMNS: &str = "id, account_id, amount, description, status, admin_id, admin_note, transaction_id, requested_at, processed_at";

/// Fixed-width timestamps so TEXT ordering matches time ordering.
pub(crate) fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str, what: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid {} timestamp", what))?
        .with_timezone(&Utc))
}

fn parse_uuid(value: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(value).with_context(|| format!("Invalid {}", what))
}

pub(crate) fn row_to_account(row: &SqliteRow) -> Result<Account> {
    let id_str: String = row.get("id");
    let role_str: String = row.get("role");
    let created_at_str: String = row.get("created_at");
    let updated_at_str: String = row.get("updated_at");

    Ok(Account {
        id: parse_uuid(&id_str, "account ID")?,
        name: row.get("name"),
        email: row.get("email"),
        account_number: row.get("account_number"),
        role: Role::from_str(&role_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid role: {}", role_str))?,
        balance: row.get("balance"),
        created_at: parse_timestamp(&created_at_str, "created_at")?,
        updated_at: parse_timestamp(&updated_at_str, "updated_at")?,
    })
}

pub(crate) fn row_to_category(row: &SqliteRow) -> Result<WasteCategory> {
    let created_at_str: String = row.get("created_at");
    let updated_at_str: String = row.get("updated_at");

    Ok(WasteCategory {
        id: row.get("id"),
        name: row.get("name"),
        price_per_kg: row.get("price_per_kg"),
        created_at: parse_timestamp(&created_at_str, "created_at")?,
        updated_at: parse_timestamp(&updated_at_str, "updated_at")?,
    })
}

pub(crate) fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
    let id_str: String = row.get("id");
    let account_str: String = row.get("account_id");
    let type_str: String = row.get("transaction_type");
    let created_at_str: String = row.get("created_at");
    let updated_at_str: String = row.get("updated_at");

    Ok(Transaction {
        id: parse_uuid(&id_str, "transaction ID")?,
        account_id: parse_uuid(&account_str, "account ID")?,
        transaction_type: TransactionType::from_str(&type_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid transaction type: {}", type_str))?,
        total_amount: row.get("total_amount"),
        description: row.get("description"),
        created_at: parse_timestamp(&created_at_str, "created_at")?,
        updated_at: parse_timestamp(&updated_at_str, "updated_at")?,
    })
}

pub(crate) fn row_to_item(row: &SqliteRow) -> Result<TransactionItem> {
    let id_str: String = row.get("id");
    let transaction_str: String = row.get("transaction_id");

    Ok(TransactionItem {
        id: parse_uuid(&id_str, "item ID")?,
        transaction_id: parse_uuid(&transaction_str, "transaction ID")?,
        waste_category_id: row.get("waste_category_id"),
        weight_grams: row.get("weight_grams"),
        subtotal: row.get("subtotal"),
    })
}

pub(crate) fn row_to_request(row: &SqliteRow) -> Result<WithdrawalRequest> {
    let id_str: String = row.get("id");
    let account_str: String = row.get("account_id");
    let status_str: String = row.get("status");
    let admin_str: Option<String> = row.get("admin_id");
    let transaction_str: Option<String> = row.get("transaction_id");
    let requested_at_str: String = row.get("requested_at");
    let processed_at_str: Option<String> = row.get("processed_at");

    Ok(WithdrawalRequest {
        id: parse_uuid(&id_str, "request ID")?,
        account_id: parse_uuid(&account_str, "account ID")?,
        amount: row.get("amount"),
        description: row.get("description"),
        status: WithdrawalStatus::from_str(&status_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid request status: {}", status_str))?,
        admin_id: admin_str
            .map(|s| parse_uuid(&s, "admin ID"))
            .transpose()?,
        admin_note: row.get("admin_note"),
        transaction_id: transaction_str
            .map(|s| parse_uuid(&s, "transaction ID"))
            .transpose()?,
        requested_at: parse_timestamp(&requested_at_str, "requested_at")?,
        processed_at: processed_at_str
            .map(|s| parse_timestamp(&s, "processed_at"))
            .transpose()?,
    })
}

pub(crate) async fn fetch_account<'e, E>(executor: E, id: AccountId) -> Result<Option<Account>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!("SELECT {} FROM accounts WHERE id = ?", ACCOUNT_COLUMNS);
    let row = sqlx::query(&query)
        .bind(id.to_string())
        .fetch_optional(executor)
        .await
        .context("Failed to fetch account")?;

    row.as_ref().map(row_to_account).transpose()
}

pub(crate) async fn fetch_category<'e, E>(
    executor: E,
    id: CategoryId,
) -> Result<Option<WasteCategory>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!("SELECT {} FROM waste_categories WHERE id = ?", CATEGORY_COLUMNS);
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("Failed to fetch waste category")?;

    row.as_ref().map(row_to_category).transpose()
}

pub(crate) async fn fetch_transaction<'e, E>(
    executor: E,
    id: TransactionId,
) -> Result<Option<Transaction>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!("SELECT {} FROM transactions WHERE id = ?", TRANSACTION_COLUMNS);
    let row = sqlx::query(&query)
        .bind(id.to_string())
        .fetch_optional(executor)
        .await
        .context("Failed to fetch transaction")?;

    row.as_ref().map(row_to_transaction).transpose()
}

pub(crate) async fn fetch_items<'e, E>(
    executor: E,
    transaction_id: TransactionId,
) -> Result<Vec<TransactionItem>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!(
        "SELECT {} FROM transaction_items WHERE transaction_id = ? ORDER BY rowid",
        ITEM_COLUMNS
    );
    let rows = sqlx::query(&query)
        .bind(transaction_id.to_string())
        .fetch_all(executor)
        .await
        .context("Failed to fetch transaction items")?;

    rows.iter().map(row_to_item).collect()
}

pub(crate) async fn fetch_request<'e, E>(
    executor: E,
    id: WithdrawalRequestId,
) -> Result<Option<WithdrawalRequest>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!("SELECT {} FROM withdrawal_requests WHERE id = ?", REQUEST_COLUMNS);
    let row = sqlx::query(&query)
        .bind(id.to_string())
        .fetch_optional(executor)
        .await
        .context("Failed to fetch withdrawal request")?;

    row.as_ref().map(row_to_request).transpose()
}
