use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{
    Account, AccountId, TransactionDetail, WithdrawalRequest, format_cents, format_kg,
};

/// Everything the ledger holds for one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub account: Account,
    pub transactions: Vec<TransactionDetail>,
    pub requests: Vec<WithdrawalRequest>,
}

/// Writes ledger data out as CSV or JSON
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// One row per transaction, newest first.
    pub async fn export_transactions_csv<W: Write>(
        &self,
        account_id: AccountId,
        writer: W,
    ) -> Result<usize> {
        let transactions = self.service.list_account_transactions(account_id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "created_at",
            "type",
            "total_amount",
            "total_cents",
            "weight_kg",
            "item_count",
            "description",
        ])?;

        for detail in &transactions {
            let transaction = &detail.transaction;
            csv_writer.write_record([
                transaction.id.to_string(),
                transaction.created_at.to_rfc3339(),
                transaction.transaction_type.as_str().to_string(),
                format_cents(transaction.total_amount),
                transaction.total_amount.to_string(),
                format_kg(detail.total_weight()),
                detail.items.len().to_string(),
                transaction.description.clone().unwrap_or_default(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(transactions.len())
    }

    /// One row per deposit item, with the category name and price snapshot.
    pub async fn export_items_csv<W: Write>(&self, account_id: AccountId, writer: W) -> Result<usize> {
        let transactions = self.service.list_account_transactions(account_id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "transaction_id",
            "created_at",
            "category_id",
            "category",
            "weight_kg",
            "subtotal",
        ])?;

        let mut count = 0;
        for detail in &transactions {
            for line in &detail.items {
                csv_writer.write_record([
                    detail.transaction.id.to_string(),
                    detail.transaction.created_at.to_rfc3339(),
                    line.item.waste_category_id.to_string(),
                    line.category
                        .as_ref()
                        .map(|c| c.name.clone())
                        .unwrap_or_default(),
                    format_kg(line.item.weight_grams),
                    format_cents(line.item.subtotal),
                ])?;
                count += 1;
            }
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Account, transactions and withdrawal requests as a pretty-printed JSON document.
    pub async fn export_account_json<W: Write>(
        &self,
        account_id: AccountId,
        mut writer: W,
    ) -> Result<AccountSnapshot> {
        let account = self.service.get_account(account_id).await?;
        let transactions = self.service.list_account_transactions(account_id).await?;
        let requests = self.service.list_account_requests(account_id).await?;

        let snapshot = AccountSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            account,
            transactions,
            requests,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
