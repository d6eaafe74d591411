use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, CategoryId, Cents, Grams, WasteCategory};

pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// Waste handed in; credits the account
    Deposit,
    /// Cash paid out; debits the account
    Withdrawal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "deposit" => Some(TransactionType::Deposit),
            "withdrawal" => Some(TransactionType::Withdrawal),
            _ => None,
        }
    }

    /// +1 for balance-raising types, -1 for balance-lowering ones.
    pub fn sign(&self) -> Cents {
        match self {
            TransactionType::Deposit => 1,
            TransactionType::Withdrawal => -1,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A balance-affecting ledger entry owned by one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub transaction_type: TransactionType,
    /// Always positive; the type decides the direction
    pub total_amount: Cents,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        account_id: AccountId,
        transaction_type: TransactionType,
        total_amount: Cents,
        description: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            account_id,
            transaction_type,
            total_amount,
            description,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_deposit(&self) -> bool {
        self.transaction_type == TransactionType::Deposit
    }

    /// Signed effect of this transaction on its account's balance.
    pub fn balance_effect(&self) -> Cents {
        self.transaction_type.sign() * self.total_amount
    }
}

/// One weighed line of a deposit. The subtotal is a price snapshot taken when
/// the line was written and is never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionItem {
    pub id: Uuid,
    pub transaction_id: TransactionId,
    pub waste_category_id: CategoryId,
    pub weight_grams: Grams,
    pub subtotal: Cents,
}

/// Requested deposit line, before pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInput {
    pub category_id: CategoryId,
    pub weight_grams: Grams,
}

impl ItemInput {
    pub fn new(category_id: CategoryId, weight_grams: Grams) -> Self {
        Self {
            category_id,
            weight_grams,
        }
    }
}

/// Changes requested by an edit. Absent fields are left as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionPatch {
    pub description: Option<String>,
    /// Full replacement item set (deposits only)
    pub items: Option<Vec<ItemInput>>,
    /// New amount (withdrawals only)
    pub amount: Option<Cents>,
}

impl TransactionPatch {
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_items(mut self, items: Vec<ItemInput>) -> Self {
        self.items = Some(items);
        self
    }

    pub fn with_amount(mut self, amount: Cents) -> Self {
        self.amount = Some(amount);
        self
    }
}

/// An item together with the catalog entry it references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDetail {
    pub item: TransactionItem,
    pub category: Option<WasteCategory>,
}

/// A transaction with its items and their resolved categories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDetail {
    pub transaction: Transaction,
    pub items: Vec<ItemDetail>,
}

impl TransactionDetail {
    pub fn total_weight(&self) -> Grams {
        self.items.iter().map(|i| i.item.weight_grams).sum()
    }

    pub fn items_total(&self) -> Cents {
        self.items.iter().map(|i| i.item.subtotal).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_effect_follows_type() {
        let account = Uuid::new_v4();
        let deposit = Transaction::new(account, TransactionType::Deposit, 7500, None);
        let withdrawal = Transaction::new(account, TransactionType::Withdrawal, 2000, None);

        assert_eq!(deposit.balance_effect(), 7500);
        assert_eq!(withdrawal.balance_effect(), -2000);
        assert!(deposit.is_deposit());
        assert!(!withdrawal.is_deposit());
    }

    #[test]
    fn test_transaction_type_names() {
        assert_eq!(TransactionType::from_str("DEPOSIT"), Some(TransactionType::Deposit));
        assert_eq!(TransactionType::from_str("withdrawal"), Some(TransactionType::Withdrawal));
        assert_eq!(TransactionType::from_str("transfer"), None);
    }

    #[test]
    fn test_patch_builder() {
        let patch = TransactionPatch::default()
            .with_description("fixed weight")
            .with_items(vec![ItemInput::new(1, 2000)]);

        assert_eq!(patch.description.as_deref(), Some("fixed weight"));
        assert_eq!(patch.items.as_ref().map(Vec::len), Some(1));
        assert!(patch.amount.is_none());
    }
}
