use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{
    Account, AccountId, CategoryId, Cents, ItemInput, Transaction, TransactionId, item_subtotal,
};

/// Compute ledger balances for every account that has transactions.
/// Balance = sum of deposits - sum of withdrawals
pub fn compute_all_balances(transactions: &[Transaction]) -> HashMap<AccountId, Cents> {
    let mut balances: HashMap<AccountId, Cents> = HashMap::new();
    for transaction in transactions {
        let balance = balances.entry(transaction.account_id).or_insert(0);
        // Exact whenever the final sum fits, whatever the row order.
        *balance = balance.wrapping_add(transaction.balance_effect());
    }
    balances
}

/// A deposit line after its category price has been looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedItem {
    pub input: ItemInput,
    pub price_per_kg: Cents,
    pub subtotal: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    NoItems,
    InvalidWeight { category_id: CategoryId, weight_grams: i64 },
    UnknownCategory(CategoryId),
    /// A subtotal or the deposit total does not fit in [`Cents`].
    Overflow,
}

impl std::fmt::Display for PricingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PricingError::NoItems => write!(f, "a deposit needs at least one item"),
            PricingError::InvalidWeight {
                category_id,
                weight_grams,
            } => write!(
                f,
                "weight for category {} must be positive, got {} g",
                category_id, weight_grams
            ),
            PricingError::UnknownCategory(id) => write!(f, "waste category {} not found", id),
            PricingError::Overflow => write!(f, "deposit value is too large"),
        }
    }
}

impl std::error::Error for PricingError {}

/// Check deposit lines without touching the catalog.
pub fn validate_items(items: &[ItemInput]) -> Result<(), PricingError> {
    if items.is_empty() {
        return Err(PricingError::NoItems);
    }
    if let Some(bad) = items.iter().find(|i| i.weight_grams <= 0) {
        return Err(PricingError::InvalidWeight {
            category_id: bad.category_id,
            weight_grams: bad.weight_grams,
        });
    }
    Ok(())
}

/// Price deposit lines against a catalog lookup and return them with the total.
/// Any unknown category fails the whole set.
pub fn price_items<F>(items: &[ItemInput], price_of: F) -> Result<(Vec<PricedItem>, Cents), PricingError>
where
    F: Fn(CategoryId) -> Option<Cents>,
{
    validate_items(items)?;

    let mut total: Cents = 0;
    let mut priced = Vec::with_capacity(items.len());
    for input in items {
        let price_per_kg =
            price_of(input.category_id).ok_or(PricingError::UnknownCategory(input.category_id))?;
        let subtotal =
            item_subtotal(price_per_kg, input.weight_grams).ok_or(PricingError::Overflow)?;
        total = total.checked_add(subtotal).ok_or(PricingError::Overflow)?;
        priced.push(PricedItem {
            input: *input,
            price_per_kg,
            subtotal,
        });
    }
    Ok((priced, total))
}

/// One problem found while reconciling the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrityIssue {
    BalanceMismatch {
        account_id: AccountId,
        stored: Cents,
        ledger: Cents,
    },
    NegativeBalance {
        account_id: AccountId,
        balance: Cents,
    },
    MultiplePendingRequests {
        account_id: AccountId,
        count: i64,
    },
    DepositTotalMismatch {
        transaction_id: TransactionId,
        total_amount: Cents,
        items_total: Cents,
    },
}

impl std::fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrityIssue::BalanceMismatch {
                account_id,
                stored,
                ledger,
            } => write!(
                f,
                "account {} stores balance {} but its ledger sums to {}",
                account_id, stored, ledger
            ),
            IntegrityIssue::NegativeBalance {
                account_id,
                balance,
            } => write!(f, "account {} has negative balance {}", account_id, balance),
            IntegrityIssue::MultiplePendingRequests { account_id, count } => write!(
                f,
                "account {} has {} pending withdrawal requests",
                account_id, count
            ),
            IntegrityIssue::DepositTotalMismatch {
                transaction_id,
                total_amount,
                items_total,
            } => write!(
                f,
                "deposit {} totals {} but its items sum to {}",
                transaction_id, total_amount, items_total
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub account_count: i64,
    pub transaction_count: i64,
    pub total_balance: Cents,
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Reconcile stored balances against ledger sums and collect every violation.
pub fn build_integrity_report(
    accounts: &[Account],
    ledger_balances: &HashMap<AccountId, Cents>,
    transaction_count: i64,
    pending_counts: &HashMap<AccountId, i64>,
    deposit_mismatches: Vec<(TransactionId, Cents, Cents)>,
) -> IntegrityReport {
    let mut issues = Vec::new();

    for account in accounts {
        let ledger = ledger_balances.get(&account.id).copied().unwrap_or(0);
        if ledger != account.balance {
            issues.push(IntegrityIssue::BalanceMismatch {
                account_id: account.id,
                stored: account.balance,
                ledger,
            });
        }
        if account.balance < 0 {
            issues.push(IntegrityIssue::NegativeBalance {
                account_id: account.id,
                balance: account.balance,
            });
        }
    }

    let mut pending: Vec<_> = pending_counts.iter().filter(|(_, c)| **c > 1).collect();
    pending.sort_by_key(|(id, _)| **id);
    for (account_id, count) in pending {
        issues.push(IntegrityIssue::MultiplePendingRequests {
            account_id: *account_id,
            count: *count,
        });
    }

    for (transaction_id, total_amount, items_total) in deposit_mismatches {
        issues.push(IntegrityIssue::DepositTotalMismatch {
            transaction_id,
            total_amount,
            items_total,
        });
    }

    IntegrityReport {
        account_count: accounts.len() as i64,
        transaction_count,
        total_balance: accounts.iter().map(|a| a.balance).sum(),
        issues,
    }
}
