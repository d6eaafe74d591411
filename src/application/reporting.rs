use serde::{Deserialize, Serialize};

use crate::domain::{AccountId, CategoryId, Cents, Grams};

use super::{AppError, LedgerService};

/// Summary of one account's ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountReport {
    pub account_id: AccountId,
    pub total_deposit: Cents,
    pub total_withdrawal: Cents,
    pub transaction_count: i64,
    pub deposit_count: i64,
    pub withdrawal_count: i64,
    pub total_weight_grams: Grams,
    pub average_deposit: Cents,
    pub average_withdrawal: Cents,
    pub current_balance: Cents,
    pub net: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category_id: CategoryId,
    pub category: String,
    pub item_count: i64,
    pub weight_grams: Grams,
    pub earned: Cents,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub account_id: AccountId,
    pub categories: Vec<CategorySummary>,
    pub total_earned: Cents,
}

/// Mean of `count` amounts summing to `total`, rounded to the nearest cent.
fn average(total: Cents, count: i64) -> Cents {
    if count == 0 {
        0
    } else {
        (total + count / 2) / count
    }
}

impl LedgerService {
    pub async fn account_report(&self, account_id: AccountId) -> Result<AccountReport, AppError> {
        let account = self.get_account(account_id).await?;
        let totals = self.repo().ledger_totals(account_id).await?;

        Ok(AccountReport {
            account_id,
            total_deposit: totals.deposit_total,
            total_withdrawal: totals.withdrawal_total,
            transaction_count: totals.deposit_count + totals.withdrawal_count,
            deposit_count: totals.deposit_count,
            withdrawal_count: totals.withdrawal_count,
            total_weight_grams: totals.deposited_weight,
            average_deposit: average(totals.deposit_total, totals.deposit_count),
            average_withdrawal: average(totals.withdrawal_total, totals.withdrawal_count),
            current_balance: account.balance,
            net: totals.deposit_total - totals.withdrawal_total,
        })
    }

    /// Deposited weight and earnings per waste category, highest earnings first.
    pub async fn category_breakdown(
        &self,
        account_id: AccountId,
    ) -> Result<CategoryBreakdown, AppError> {
        self.get_account(account_id).await?;
        let aggregates = self.repo().category_aggregates(account_id).await?;
        let total_earned: Cents = aggregates.iter().map(|a| a.earned).sum();

        let categories = aggregates
            .into_iter()
            .map(|a| CategorySummary {
                percentage: if total_earned > 0 {
                    (a.earned as f64 / total_earned as f64) * 100.0
                } else {
                    0.0
                },
                category_id: a.category_id,
                category: a.category_name,
                item_count: a.item_count,
                weight_grams: a.weight,
                earned: a.earned,
            })
            .collect();

        Ok(CategoryBreakdown {
            account_id,
            categories,
            total_earned,
        })
    }
}
