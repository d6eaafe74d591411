//! Ledger engine steps. Each function runs inside a caller-owned unit of
//! work, so composite operations (approving a request, editing a deposit)
//! reuse them without opening nested transactions.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::domain::{
    AccountId, Actor, CategoryId, Cents, ItemDetail, ItemInput, PricedItem, Transaction,
    TransactionDetail, TransactionId, TransactionItem, TransactionPatch, TransactionType,
    WasteCategory, price_items, validate_items,
};
use crate::storage::UnitOfWork;

use super::{AppError, BalanceAdjustment, DeletionReceipt, EditResult};

/// Config values the engine needs inside a unit of work.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Policy {
    pub deletion_window: Duration,
    pub min_withdrawal: Cents,
}

impl Policy {
    pub fn check_withdrawal_amount(&self, amount: Cents) -> Result<(), AppError> {
        if amount <= 0 {
            return Err(AppError::InvalidInput(format!(
                "withdrawal amount must be positive, got {}",
                amount
            )));
        }
        if amount < self.min_withdrawal {
            return Err(AppError::InvalidInput(format!(
                "withdrawal amount {} is below the minimum of {}",
                amount, self.min_withdrawal
            )));
        }
        Ok(())
    }
}

/// The single balance-adjustment step. Re-reads the balance inside the unit
/// and refuses any delta that would leave it negative.
pub(crate) async fn apply_delta(
    uow: &mut UnitOfWork,
    account_id: AccountId,
    delta: Cents,
) -> Result<Cents, AppError> {
    let balance = current_balance(uow, account_id).await?;
    let Some(next) = balance.checked_add(delta) else {
        return Err(AppError::InvalidInput(format!(
            "balance of account {} cannot absorb a change of {}",
            account_id, delta
        )));
    };
    if next < 0 {
        return Err(AppError::InsufficientBalance {
            account_id,
            balance,
            required: -delta,
        });
    }
    Ok(uow.adjust_balance(account_id, delta).await?)
}

pub(crate) async fn current_balance(
    uow: &mut UnitOfWork,
    account_id: AccountId,
) -> Result<Cents, AppError> {
    uow.read_balance(account_id)
        .await?
        .ok_or_else(|| AppError::not_found("Account", account_id))
}

/// Look up current prices for deposit lines. Returns the priced lines, their
/// total and the categories that were resolved.
async fn price_deposit(
    uow: &mut UnitOfWork,
    items: &[ItemInput],
) -> Result<(Vec<PricedItem>, Cents, HashMap<CategoryId, WasteCategory>), AppError> {
    validate_items(items)?;

    let mut catalog: HashMap<CategoryId, WasteCategory> = HashMap::new();
    for item in items {
        if catalog.contains_key(&item.category_id) {
            continue;
        }
        if let Some(category) = uow.category(item.category_id).await? {
            catalog.insert(category.id, category);
        }
    }

    let (priced, total) = price_items(items, |id| catalog.get(&id).map(|c| c.price_per_kg))?;
    Ok((priced, total, catalog))
}

fn item_rows(transaction_id: TransactionId, priced: &[PricedItem]) -> Vec<TransactionItem> {
    priced
        .iter()
        .map(|p| TransactionItem {
            id: Uuid::new_v4(),
            transaction_id,
            waste_category_id: p.input.category_id,
            weight_grams: p.input.weight_grams,
            subtotal: p.subtotal,
        })
        .collect()
}

/// Pair items with their categories, fetching any the caller didn't already have.
async fn with_categories(
    uow: &mut UnitOfWork,
    transaction: Transaction,
    items: Vec<TransactionItem>,
    mut catalog: HashMap<CategoryId, WasteCategory>,
) -> Result<TransactionDetail, AppError> {
    for item in &items {
        if !catalog.contains_key(&item.waste_category_id) {
            if let Some(category) = uow.category(item.waste_category_id).await? {
                catalog.insert(category.id, category);
            }
        }
    }

    let items = items
        .into_iter()
        .map(|item| ItemDetail {
            category: catalog.get(&item.waste_category_id).cloned(),
            item,
        })
        .collect();
    Ok(TransactionDetail { transaction, items })
}

pub(crate) async fn record_deposit(
    uow: &mut UnitOfWork,
    account_id: AccountId,
    description: Option<String>,
    items: &[ItemInput],
) -> Result<TransactionDetail, AppError> {
    current_balance(uow, account_id).await?;
    let (priced, total, catalog) = price_deposit(uow, items).await?;

    let transaction = Transaction::new(account_id, TransactionType::Deposit, total, description);
    let rows = item_rows(transaction.id, &priced);

    uow.insert_transaction(&transaction).await?;
    uow.insert_items(&rows).await?;
    apply_delta(uow, account_id, total).await?;

    with_categories(uow, transaction, rows, catalog).await
}

/// Shared by direct withdrawals and request approval.
pub(crate) async fn record_withdrawal(
    uow: &mut UnitOfWork,
    account_id: AccountId,
    amount: Cents,
    description: Option<String>,
) -> Result<Transaction, AppError> {
    let balance = current_balance(uow, account_id).await?;
    if balance < amount {
        return Err(AppError::InsufficientBalance {
            account_id,
            balance,
            required: amount,
        });
    }

    let transaction =
        Transaction::new(account_id, TransactionType::Withdrawal, amount, description);
    uow.insert_transaction(&transaction).await?;
    apply_delta(uow, account_id, -amount).await?;
    Ok(transaction)
}

pub(crate) async fn edit_transaction(
    uow: &mut UnitOfWork,
    id: TransactionId,
    patch: TransactionPatch,
    actor: Actor,
    policy: Policy,
) -> Result<EditResult, AppError> {
    let mut transaction = uow
        .transaction(id)
        .await?
        .ok_or_else(|| AppError::not_found("Transaction", id))?;
    let owner = transaction.account_id;

    if !actor.can_manage(owner) {
        return Err(AppError::Unauthorized(format!(
            "account {} cannot edit transaction {}",
            actor.account_id, id
        )));
    }

    let old_total = transaction.total_amount;
    let mut catalog = HashMap::new();

    let new_total = match transaction.transaction_type {
        TransactionType::Deposit => {
            if patch.amount.is_some() {
                return Err(AppError::InvalidInput(
                    "a deposit total is derived from its items; supply replacement items instead"
                        .to_string(),
                ));
            }
            match &patch.items {
                Some(items) => {
                    let (priced, total, resolved) = price_deposit(uow, items).await?;
                    uow.delete_items(id).await?;
                    uow.insert_items(&item_rows(id, &priced)).await?;
                    catalog = resolved;
                    total
                }
                None => old_total,
            }
        }
        TransactionType::Withdrawal => {
            if patch.items.is_some() {
                return Err(AppError::InvalidInput(
                    "withdrawals have no items".to_string(),
                ));
            }
            match patch.amount {
                Some(amount) if amount != old_total => {
                    policy.check_withdrawal_amount(amount)?;
                    if let Some(request) = uow.request_for_transaction(id).await? {
                        return Err(AppError::InvalidState(format!(
                            "withdrawal {} was produced by approved request {}; its amount is fixed",
                            id, request.id
                        )));
                    }
                    // Check against the balance as if this withdrawal never happened
                    let balance_before = current_balance(uow, owner).await? + old_total;
                    if balance_before < amount {
                        return Err(AppError::InsufficientBalance {
                            account_id: owner,
                            balance: balance_before,
                            required: amount,
                        });
                    }
                    amount
                }
                _ => old_total,
            }
        }
    };

    let balance_delta = transaction.transaction_type.sign() * (new_total - old_total);
    if balance_delta != 0 {
        apply_delta(uow, owner, balance_delta).await?;
    }

    if let Some(description) = patch.description {
        transaction.description = Some(description);
    }
    transaction.total_amount = new_total;
    transaction.updated_at = Utc::now();
    uow.update_transaction(&transaction).await?;

    let items = uow.items(id).await?;
    let detail = with_categories(uow, transaction, items, catalog).await?;
    let account = uow
        .account(owner)
        .await?
        .ok_or_else(|| AppError::not_found("Account", owner))?;

    Ok(EditResult {
        detail,
        account,
        balance_delta,
    })
}

pub(crate) async fn delete_transaction(
    uow: &mut UnitOfWork,
    id: TransactionId,
    actor: Actor,
    policy: Policy,
    now: DateTime<Utc>,
) -> Result<DeletionReceipt, AppError> {
    let transaction = uow
        .transaction(id)
        .await?
        .ok_or_else(|| AppError::not_found("Transaction", id))?;
    let owner = transaction.account_id;

    if !actor.can_manage(owner) {
        return Err(AppError::Unauthorized(format!(
            "account {} cannot delete transaction {}",
            actor.account_id, id
        )));
    }
    if !actor.role.is_admin() && now - transaction.created_at > policy.deletion_window {
        return Err(AppError::DeletionWindowExpired {
            id,
            created_at: transaction.created_at,
            window_hours: policy.deletion_window.num_hours(),
        });
    }
    if let Some(request) = uow.request_for_transaction(id).await? {
        return Err(AppError::InvalidState(format!(
            "withdrawal {} belongs to approved request {} and cannot be deleted",
            id, request.id
        )));
    }

    let amount = transaction.total_amount;
    let (delta, adjustment) = match transaction.transaction_type {
        TransactionType::Deposit => {
            // The user may already have spent part of what is being rolled back
            let balance = current_balance(uow, owner).await?;
            if balance < amount {
                return Err(AppError::InsufficientBalance {
                    account_id: owner,
                    balance,
                    required: amount,
                });
            }
            (-amount, BalanceAdjustment::Decreased)
        }
        TransactionType::Withdrawal => (amount, BalanceAdjustment::Increased),
    };

    let items_removed = uow.delete_items(id).await?;
    uow.delete_transaction(id).await?;
    let balance_after = apply_delta(uow, owner, delta).await?;

    Ok(DeletionReceipt {
        transaction,
        items_removed,
        adjustment,
        amount,
        balance_after,
    })
}

