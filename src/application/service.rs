use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::domain::{
    Account, AccountId, Actor, CategoryId, Cents, IntegrityReport, ItemDetail, ItemInput, Role,
    Transaction, TransactionDetail, TransactionId, TransactionItem, TransactionPatch,
    WasteCategory, build_integrity_report, compute_all_balances, generate_account_number,
};
use crate::storage::Repository;

use super::engine::{self, Policy};
use super::{AppError, LedgerConfig};

/// How many fresh account numbers to try before giving up.
const ACCOUNT_NUMBER_ATTEMPTS: usize = 5;

/// Application service providing high-level operations for the ledger.
/// This is the primary interface for any client (CLI, API, etc.). Clones
/// share the same connection pool.
#[derive(Clone)]
pub struct LedgerService {
    repo: Repository,
    config: LedgerConfig,
}

/// Result of editing a transaction
#[derive(Debug)]
pub struct EditResult {
    pub detail: TransactionDetail,
    /// The owning account after the balance adjustment
    pub account: Account,
    /// Signed change applied to the owner's balance
    pub balance_delta: Cents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceAdjustment {
    Decreased,
    Increased,
}

/// What a deletion removed and how it moved the balance.
#[derive(Debug)]
pub struct DeletionReceipt {
    pub transaction: Transaction,
    pub items_removed: u64,
    pub adjustment: BalanceAdjustment,
    pub amount: Cents,
    pub balance_after: Cents,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository, config: LedgerConfig) -> Self {
        Self { repo, config }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        Self::init_with_config(database_path, LedgerConfig::default()).await
    }

    pub async fn init_with_config(
        database_path: &str,
        config: LedgerConfig,
    ) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url, &config.store).await?;
        Ok(Self::new(repo, config))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        Self::connect_with_config(database_path, LedgerConfig::default()).await
    }

    pub async fn connect_with_config(
        database_path: &str,
        config: LedgerConfig,
    ) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url, &config.store).await?;
        Ok(Self::new(repo, config))
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub(crate) fn repo(&self) -> &Repository {
        &self.repo
    }

    pub(crate) fn policy(&self) -> Policy {
        Policy {
            deletion_window: self.config.deletion_window(),
            min_withdrawal: self.config.min_withdrawal,
        }
    }

    // ========================
    // Account operations
    // ========================

    /// Register a new account with a zero balance and a fresh 10-digit account number.
    pub async fn create_account(
        &self,
        name: &str,
        email: &str,
        role: Role,
    ) -> Result<Account, AppError> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput("account name cannot be empty".to_string()));
        }
        if !email.contains('@') {
            return Err(AppError::InvalidInput(format!("invalid email address: {}", email)));
        }
        if self.repo.get_account_by_email(email).await?.is_some() {
            return Err(AppError::AlreadyExists(format!("account with email {}", email)));
        }

        let mut account = Account::new(name, email, role);
        let mut attempts = 1;
        while self.repo.account_number_exists(&account.account_number).await? {
            if attempts == ACCOUNT_NUMBER_ATTEMPTS {
                return Err(AppError::AlreadyExists(
                    "could not allocate a unique account number".to_string(),
                ));
            }
            account.account_number = generate_account_number();
            attempts += 1;
        }

        self.repo.save_account(&account).await?;
        info!(account_id = %account.id, role = account.role.as_str(), "account created");
        Ok(account)
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Account, AppError> {
        self.repo
            .get_account(id)
            .await?
            .ok_or_else(|| AppError::not_found("Account", id))
    }

    pub async fn get_account_by_email(&self, email: &str) -> Result<Account, AppError> {
        self.repo
            .get_account_by_email(email)
            .await?
            .ok_or_else(|| AppError::not_found("Account", email))
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_accounts().await?)
    }

    /// Stored balance of an account.
    pub async fn get_balance(&self, id: AccountId) -> Result<Cents, AppError> {
        Ok(self.get_account(id).await?.balance)
    }

    // ========================
    // Waste catalog
    // ========================

    pub async fn create_category(
        &self,
        name: &str,
        price_per_kg: Cents,
    ) -> Result<WasteCategory, AppError> {
        let name = validate_category(name, price_per_kg)?;
        if self.repo.get_category_by_name(name).await?.is_some() {
            return Err(AppError::AlreadyExists(format!("waste category {}", name)));
        }
        let category = self.repo.save_category(name, price_per_kg).await?;
        info!(category_id = category.id, price_per_kg, "waste category created");
        Ok(category)
    }

    pub async fn get_category(&self, id: CategoryId) -> Result<WasteCategory, AppError> {
        self.repo
            .get_category(id)
            .await?
            .ok_or(AppError::CategoryNotFound(id))
    }

    pub async fn list_categories(&self) -> Result<Vec<WasteCategory>, AppError> {
        Ok(self.repo.list_categories().await?)
    }

    /// Rename and/or reprice a category. Deposits already recorded keep the
    /// subtotals they were priced with.
    pub async fn update_category(
        &self,
        id: CategoryId,
        name: Option<String>,
        price_per_kg: Option<Cents>,
    ) -> Result<WasteCategory, AppError> {
        let current = self.get_category(id).await?;
        let name = name.unwrap_or(current.name);
        let price_per_kg = price_per_kg.unwrap_or(current.price_per_kg);
        let name = validate_category(&name, price_per_kg)?;

        if let Some(other) = self.repo.get_category_by_name(name).await? {
            if other.id != id {
                return Err(AppError::AlreadyExists(format!("waste category {}", name)));
            }
        }

        self.repo
            .update_category(id, name, price_per_kg)
            .await?
            .ok_or(AppError::CategoryNotFound(id))
    }

    /// Remove a category nobody has deposited yet.
    pub async fn delete_category(&self, id: CategoryId) -> Result<WasteCategory, AppError> {
        let category = self.get_category(id).await?;
        let in_use = self.repo.count_items_for_category(id).await?;
        if in_use > 0 {
            return Err(AppError::InvalidState(format!(
                "waste category {} is referenced by {} deposit item(s)",
                category.name, in_use
            )));
        }
        self.repo.delete_category(id).await?;
        Ok(category)
    }

    // ========================
    // Ledger operations
    // ========================

    /// Record a deposit priced at current category rates and credit the account.
    #[instrument(skip(self, items), fields(item_count = items.len()))]
    pub async fn create_deposit(
        &self,
        account_id: AccountId,
        description: Option<String>,
        items: Vec<ItemInput>,
    ) -> Result<TransactionDetail, AppError> {
        let detail = self
            .repo
            .unit_of_work(move |uow| {
                Box::pin(async move {
                    engine::record_deposit(uow, account_id, description, &items).await
                })
            })
            .await
            .inspect_err(log_rejection("create_deposit"))?;

        info!(
            transaction_id = %detail.transaction.id,
            total = detail.transaction.total_amount,
            "deposit recorded"
        );
        Ok(detail)
    }

    /// Debit the account directly, outside the request workflow.
    #[instrument(skip(self, description))]
    pub async fn create_withdrawal(
        &self,
        account_id: AccountId,
        amount: Cents,
        description: Option<String>,
    ) -> Result<Transaction, AppError> {
        self.policy().check_withdrawal_amount(amount)?;

        let transaction = self
            .repo
            .unit_of_work(move |uow| {
                Box::pin(async move {
                    engine::record_withdrawal(uow, account_id, amount, description).await
                })
            })
            .await
            .inspect_err(log_rejection("create_withdrawal"))?;

        info!(transaction_id = %transaction.id, amount, "withdrawal recorded");
        Ok(transaction)
    }

    /// Change a transaction's description, deposit items or withdrawal amount.
    /// The owner's balance moves by exactly the difference in total.
    #[instrument(skip(self, patch))]
    pub async fn edit_transaction(
        &self,
        id: TransactionId,
        patch: TransactionPatch,
        actor: Actor,
    ) -> Result<EditResult, AppError> {
        if let Some(amount) = patch.amount {
            if amount <= 0 {
                return Err(AppError::InvalidInput(format!(
                    "amount must be positive, got {}",
                    amount
                )));
            }
        }

        let policy = self.policy();
        let result = self
            .repo
            .unit_of_work(move |uow| {
                Box::pin(async move { engine::edit_transaction(uow, id, patch, actor, policy).await })
            })
            .await
            .inspect_err(log_rejection("edit_transaction"))?;

        info!(
            transaction_id = %id,
            balance_delta = result.balance_delta,
            balance = result.account.balance,
            "transaction edited"
        );
        Ok(result)
    }

    /// Remove a transaction and its items, reversing its balance effect.
    #[instrument(skip(self))]
    pub async fn delete_transaction(
        &self,
        id: TransactionId,
        actor: Actor,
    ) -> Result<DeletionReceipt, AppError> {
        let policy = self.policy();
        let now = Utc::now();
        let receipt = self
            .repo
            .unit_of_work(move |uow| {
                Box::pin(
                    async move { engine::delete_transaction(uow, id, actor, policy, now).await },
                )
            })
            .await
            .inspect_err(log_rejection("delete_transaction"))?;

        info!(
            transaction_id = %id,
            items_removed = receipt.items_removed,
            balance_after = receipt.balance_after,
            "transaction deleted"
        );
        Ok(receipt)
    }

    pub async fn get_transaction(&self, id: TransactionId) -> Result<TransactionDetail, AppError> {
        let transaction = self
            .repo
            .get_transaction(id)
            .await?
            .ok_or_else(|| AppError::not_found("Transaction", id))?;
        let items = self.repo.get_items(id).await?;
        self.assemble(vec![transaction], items)
            .await?
            .pop()
            .ok_or_else(|| AppError::not_found("Transaction", id))
    }

    /// An account's transactions with their items, newest first.
    pub async fn list_account_transactions(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<TransactionDetail>, AppError> {
        self.get_account(account_id).await?;
        let transactions = self.repo.list_transactions_for_account(account_id).await?;
        let items = self.repo.list_items_for_account(account_id).await?;
        self.assemble(transactions, items).await
    }

    /// Every transaction in the ledger, newest first.
    pub async fn list_all_transactions(&self) -> Result<Vec<TransactionDetail>, AppError> {
        let transactions = self.repo.list_transactions().await?;
        let items = self.repo.list_items().await?;
        self.assemble(transactions, items).await
    }

    async fn assemble(
        &self,
        transactions: Vec<Transaction>,
        items: Vec<TransactionItem>,
    ) -> Result<Vec<TransactionDetail>, AppError> {
        let categories: HashMap<CategoryId, WasteCategory> = self
            .repo
            .list_categories()
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let mut by_transaction: HashMap<TransactionId, Vec<ItemDetail>> = HashMap::new();
        for item in items {
            let category = categories.get(&item.waste_category_id).cloned();
            by_transaction
                .entry(item.transaction_id)
                .or_default()
                .push(ItemDetail { item, category });
        }

        Ok(transactions
            .into_iter()
            .map(|transaction| {
                let items = by_transaction.remove(&transaction.id).unwrap_or_default();
                TransactionDetail { transaction, items }
            })
            .collect())
    }

    // ========================
    // Integrity
    // ========================

    /// Reconcile stored balances with the ledger and check workflow invariants.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let snapshot = self.repo.integrity_snapshot().await?;
        let ledger_balances = compute_all_balances(&snapshot.transactions);

        let report = build_integrity_report(
            &snapshot.accounts,
            &ledger_balances,
            snapshot.transactions.len() as i64,
            &snapshot.pending_counts,
            snapshot.deposit_mismatches,
        );
        if !report.is_healthy() {
            warn!(issues = report.issues.len(), "integrity check found problems");
        }
        Ok(report)
    }
}

/// Warn about a mutation the ledger refused.
pub(crate) fn log_rejection(operation: &'static str) -> impl Fn(&AppError) {
    move |err| warn!(operation, kind = ?err.kind(), error = %err, "operation rejected")
}

fn validate_category(name: &str, price_per_kg: Cents) -> Result<&str, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput(
            "category name cannot be empty".to_string(),
        ));
    }
    if price_per_kg < 0 {
        return Err(AppError::InvalidInput(format!(
            "price per kg cannot be negative, got {}",
            price_per_kg
        )));
    }
    Ok(name)
}
