use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{BalanceAdjustment, LedgerConfig, LedgerService};
use crate::domain::{
    Account, ItemInput, RequestAction, Role, TransactionDetail, TransactionPatch,
    WithdrawalStatus, format_cents, format_kg, parse_cents, parse_kg,
};
use crate::storage::StoreConfig;

/// Wasteledger - recycling deposit balance ledger
#[derive(Parser, Debug)]
#[command(name = "wasteledger")]
#[command(about = "Track balances earned from recycling deposits and pay them out")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "WASTELEDGER_DB", default_value = "wasteledger.db")]
    pub database: String,

    /// Hours during which a user may delete their own transaction
    #[arg(long, env = "WASTELEDGER_DELETE_WINDOW_HOURS", default_value_t = 24)]
    pub delete_window_hours: i64,

    /// Smallest accepted withdrawal (e.g. "10.00")
    #[arg(long, env = "WASTELEDGER_MIN_WITHDRAWAL", default_value = "0")]
    pub min_withdrawal: String,

    /// Milliseconds a writer waits for the database lock
    #[arg(long, env = "WASTELEDGER_BUSY_TIMEOUT_MS", default_value_t = 5000)]
    pub busy_timeout_ms: u64,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Waste catalog commands
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Record a deposit of sorted waste
    Deposit {
        /// Account ID or email
        account: String,

        /// Deposit lines as CATEGORY_ID:KG (e.g. "1:2.5"), repeatable
        #[arg(short, long = "item", required = true)]
        items: Vec<String>,

        /// Description of the deposit
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Pay out directly from an account
    Withdraw {
        /// Account ID or email
        account: String,

        /// Amount to withdraw (e.g., "50.00" or "50")
        amount: String,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// List transactions, for one account or the whole ledger
    Transactions {
        /// Account ID or email (omit for all accounts)
        account: Option<String>,
    },

    /// Show a transaction with its items
    Show {
        /// Transaction ID
        id: String,
    },

    /// Edit a transaction
    Edit {
        /// Transaction ID
        id: String,

        /// Account performing the edit (ID or email)
        #[arg(long = "as")]
        actor: String,

        #[arg(short, long)]
        description: Option<String>,

        /// Replacement deposit lines as CATEGORY_ID:KG, repeatable
        #[arg(short, long = "item")]
        items: Vec<String>,

        /// New withdrawal amount
        #[arg(short, long)]
        amount: Option<String>,
    },

    /// Delete a transaction and reverse its balance effect
    Delete {
        /// Transaction ID
        id: String,

        /// Account performing the deletion (ID or email)
        #[arg(long = "as")]
        actor: String,
    },

    /// Withdrawal request commands
    #[command(subcommand)]
    Request(RequestCommands),

    /// Generate reports
    #[command(subcommand)]
    Report(ReportCommands),

    /// Verify ledger integrity
    Check,

    /// Export an account's data to CSV or JSON
    Export {
        /// Account ID or email
        account: String,

        /// What to export: transactions, items, full
        #[arg(default_value = "transactions")]
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum AccountCommands {
    /// Register a new account
    Create {
        name: String,

        email: String,

        /// Role: user or admin
        #[arg(short, long, default_value = "user")]
        role: String,
    },

    /// List all accounts
    List,

    /// Show account details
    Show {
        /// Account ID or email
        account: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommands {
    /// Add a waste category
    Create {
        name: String,

        /// Price per kilogram (e.g. "30.00")
        price: String,
    },

    /// List the catalog
    List,

    /// Rename or reprice a category
    Update {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        price: Option<String>,
    },

    /// Remove a category that has never been deposited
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum RequestCommands {
    /// File a withdrawal request
    Create {
        /// Account ID or email
        account: String,

        amount: String,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// List requests
    List {
        /// Only this account's requests
        #[arg(long)]
        account: Option<String>,

        /// Filter by status: pending, approved, rejected, cancelled
        #[arg(long)]
        status: Option<String>,
    },

    /// Approve or reject a pending request
    Process {
        /// Request ID
        id: String,

        /// approve or reject
        action: String,

        /// Admin account (ID or email)
        #[arg(long)]
        admin: String,

        #[arg(long)]
        note: Option<String>,
    },

    /// Cancel your own pending request
    Cancel {
        /// Request ID
        id: String,

        /// Requesting account (ID or email)
        #[arg(long = "as")]
        account: String,
    },

    /// Counts and totals per status
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Deposit and withdrawal summary for an account
    Summary {
        account: String,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Earnings per waste category for an account
    Categories {
        account: String,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },
}

impl Cli {
    fn ledger_config(&self) -> Result<LedgerConfig> {
        let min_withdrawal = parse_cents(&self.min_withdrawal)
            .context("Invalid minimum withdrawal. Use '10.00' or '10'")?;
        Ok(LedgerConfig {
            deletion_window_hours: self.delete_window_hours,
            min_withdrawal,
            store: StoreConfig {
                busy_timeout: Duration::from_millis(self.busy_timeout_ms),
                ..StoreConfig::default()
            },
        })
    }

    pub async fn run(self) -> Result<()> {
        let config = self.ledger_config()?;

        if let Commands::Init = self.command {
            LedgerService::init_with_config(&self.database, config).await?;
            println!("Database initialized: {}", self.database);
            return Ok(());
        }

        let service = LedgerService::connect_with_config(&self.database, config).await?;

        match self.command {
            Commands::Init => {}

            Commands::Account(cmd) => run_account_command(&service, cmd).await?,

            Commands::Category(cmd) => run_category_command(&service, cmd).await?,

            Commands::Deposit {
                account,
                items,
                description,
            } => {
                let account = resolve_account(&service, &account).await?;
                let items = parse_items(&items)?;
                let detail = service.create_deposit(account.id, description, items).await?;

                println!(
                    "Recorded deposit: {} for {} kg ({})",
                    format_cents(detail.transaction.total_amount),
                    format_kg(detail.total_weight()),
                    detail.transaction.id
                );
                print_balance(&service, account.id).await?;
            }

            Commands::Withdraw {
                account,
                amount,
                description,
            } => {
                let account = resolve_account(&service, &account).await?;
                let amount =
                    parse_cents(&amount).context("Invalid amount format. Use '50.00' or '50'")?;
                let transaction = service
                    .create_withdrawal(account.id, amount, description)
                    .await?;

                println!(
                    "Recorded withdrawal: {} ({})",
                    format_cents(transaction.total_amount),
                    transaction.id
                );
                print_balance(&service, account.id).await?;
            }

            Commands::Transactions { account } => {
                let transactions = match account {
                    Some(account) => {
                        let account = resolve_account(&service, &account).await?;
                        service.list_account_transactions(account.id).await?
                    }
                    None => service.list_all_transactions().await?,
                };
                print_transactions(&transactions);
            }

            Commands::Show { id } => {
                let id = parse_id(&id, "transaction")?;
                let detail = service.get_transaction(id).await?;
                print_transaction_detail(&detail);
            }

            Commands::Edit {
                id,
                actor,
                description,
                items,
                amount,
            } => {
                let id = parse_id(&id, "transaction")?;
                let actor = resolve_account(&service, &actor).await?.actor();

                let mut patch = TransactionPatch::default();
                if let Some(description) = description {
                    patch = patch.with_description(description);
                }
                if !items.is_empty() {
                    patch = patch.with_items(parse_items(&items)?);
                }
                if let Some(amount) = amount {
                    let amount = parse_cents(&amount)
                        .context("Invalid amount format. Use '50.00' or '50'")?;
                    patch = patch.with_amount(amount);
                }

                let result = service.edit_transaction(id, patch, actor).await?;
                println!(
                    "Edited {}: total {} (balance {}{})",
                    result.detail.transaction.id,
                    format_cents(result.detail.transaction.total_amount),
                    if result.balance_delta >= 0 { "+" } else { "-" },
                    format_cents(result.balance_delta.abs())
                );
                println!("Balance: {}", format_cents(result.account.balance));
            }

            Commands::Delete { id, actor } => {
                let id = parse_id(&id, "transaction")?;
                let actor = resolve_account(&service, &actor).await?.actor();
                let receipt = service.delete_transaction(id, actor).await?;

                let direction = match receipt.adjustment {
                    BalanceAdjustment::Decreased => "decreased",
                    BalanceAdjustment::Increased => "increased",
                };
                println!(
                    "Deleted {} {} ({} item(s)); balance {} by {}",
                    receipt.transaction.transaction_type.as_str(),
                    receipt.transaction.id,
                    receipt.items_removed,
                    direction,
                    format_cents(receipt.amount)
                );
                println!("Balance: {}", format_cents(receipt.balance_after));
            }

            Commands::Request(cmd) => run_request_command(&service, cmd).await?,

            Commands::Report(cmd) => run_report_command(&service, cmd).await?,

            Commands::Check => run_check_command(&service).await?,

            Commands::Export {
                account,
                export_type,
                output,
            } => {
                let account = resolve_account(&service, &account).await?;
                run_export_command(&service, account.id, &export_type, output.as_deref()).await?;
            }
        }

        Ok(())
    }
}

/// Accept either an account UUID or an email address.
async fn resolve_account(service: &LedgerService, reference: &str) -> Result<Account> {
    let account = match Uuid::parse_str(reference) {
        Ok(id) => service.get_account(id).await?,
        Err(_) => service.get_account_by_email(reference).await?,
    };
    Ok(account)
}

fn parse_id(id: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(id).with_context(|| format!("Invalid {} ID format (expected UUID)", what))
}

/// Parse "CATEGORY_ID:KG" deposit lines.
fn parse_items(raw: &[String]) -> Result<Vec<ItemInput>> {
    raw.iter()
        .map(|line| {
            let (category, weight) = line
                .split_once(':')
                .with_context(|| format!("Invalid item '{}'. Use CATEGORY_ID:KG", line))?;
            let category_id: i64 = category
                .trim()
                .parse()
                .with_context(|| format!("Invalid category ID in '{}'", line))?;
            let weight_grams = parse_kg(weight.trim())
                .with_context(|| format!("Invalid weight in '{}'", line))?;
            Ok(ItemInput::new(category_id, weight_grams))
        })
        .collect()
}

async fn print_balance(service: &LedgerService, account_id: Uuid) -> Result<()> {
    let balance = service.get_balance(account_id).await?;
    println!("Balance: {}", format_cents(balance));
    Ok(())
}

async fn run_account_command(service: &LedgerService, cmd: AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::Create { name, email, role } => {
            let role = Role::from_str(&role)
                .with_context(|| format!("Invalid role '{}'. Valid roles: user, admin", role))?;
            let account = service.create_account(&name, &email, role).await?;
            println!(
                "Created account: {} <{}> #{} ({})",
                account.name, account.email, account.account_number, account.id
            );
        }

        AccountCommands::List => {
            let accounts = service.list_accounts().await?;
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!(
                    "{:<12} {:<20} {:<28} {:<6} {:>12}",
                    "NUMBER", "NAME", "EMAIL", "ROLE", "BALANCE"
                );
                println!("{}", "-".repeat(82));
                for account in accounts {
                    println!(
                        "{:<12} {:<20} {:<28} {:<6} {:>12}",
                        account.account_number,
                        truncate(&account.name, 20),
                        truncate(&account.email, 28),
                        account.role,
                        format_cents(account.balance)
                    );
                }
            }
        }

        AccountCommands::Show { account } => {
            let account = resolve_account(service, &account).await?;
            let requests = service.list_account_requests(account.id).await?;
            let pending = requests
                .iter()
                .find(|r| r.status == WithdrawalStatus::Pending);

            println!("Account: {}", account.name);
            println!("  ID:       {}", account.id);
            println!("  Number:   {}", account.account_number);
            println!("  Email:    {}", account.email);
            println!("  Role:     {}", account.role);
            println!(
                "  Created:  {}",
                account.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!();
            println!("  Balance:  {}", format_cents(account.balance));
            if let Some(request) = pending {
                println!(
                    "  Pending:  {} requested {} ({})",
                    format_cents(request.amount),
                    request.requested_at.format("%Y-%m-%d"),
                    request.id
                );
            }
        }
    }
    Ok(())
}

async fn run_category_command(service: &LedgerService, cmd: CategoryCommands) -> Result<()> {
    match cmd {
        CategoryCommands::Create { name, price } => {
            let price = parse_cents(&price).context("Invalid price format. Use '30.00'")?;
            let category = service.create_category(&name, price).await?;
            println!(
                "Created category {}: {} at {}/kg",
                category.id,
                category.name,
                format_cents(category.price_per_kg)
            );
        }

        CategoryCommands::List => {
            let categories = service.list_categories().await?;
            if categories.is_empty() {
                println!("No waste categories found.");
            } else {
                println!("{:<6} {:<24} {:>12}", "ID", "NAME", "PRICE/KG");
                println!("{}", "-".repeat(44));
                for category in categories {
                    println!(
                        "{:<6} {:<24} {:>12}",
                        category.id,
                        truncate(&category.name, 24),
                        format_cents(category.price_per_kg)
                    );
                }
            }
        }

        CategoryCommands::Update { id, name, price } => {
            let price = price
                .map(|p| parse_cents(&p))
                .transpose()
                .context("Invalid price format. Use '30.00'")?;
            let category = service.update_category(id, name, price).await?;
            println!(
                "Updated category {}: {} at {}/kg",
                category.id,
                category.name,
                format_cents(category.price_per_kg)
            );
        }

        CategoryCommands::Delete { id } => {
            let category = service.delete_category(id).await?;
            println!("Deleted category {}: {}", category.id, category.name);
        }
    }
    Ok(())
}

async fn run_request_command(service: &LedgerService, cmd: RequestCommands) -> Result<()> {
    match cmd {
        RequestCommands::Create {
            account,
            amount,
            description,
        } => {
            let account = resolve_account(service, &account).await?;
            let amount =
                parse_cents(&amount).context("Invalid amount format. Use '50.00' or '50'")?;
            let request = service.create_request(account.id, amount, description).await?;
            println!(
                "Filed withdrawal request for {} ({})",
                format_cents(request.amount),
                request.id
            );
        }

        RequestCommands::List { account, status } => {
            let status = status
                .map(|s| {
                    WithdrawalStatus::from_str(&s).with_context(|| {
                        format!(
                            "Invalid status '{}'. Valid: pending, approved, rejected, cancelled",
                            s
                        )
                    })
                })
                .transpose()?;

            let requests = match account {
                Some(account) => {
                    let account = resolve_account(service, &account).await?;
                    service
                        .list_account_requests(account.id)
                        .await?
                        .into_iter()
                        .filter(|r| status.is_none_or(|s| r.status == s))
                        .collect()
                }
                None => service.list_requests(status).await?,
            };

            if requests.is_empty() {
                println!("No withdrawal requests found.");
            } else {
                println!(
                    "{:<36}  {:<12} {:>10} {:<10} DESCRIPTION",
                    "ID", "REQUESTED", "AMOUNT", "STATUS"
                );
                println!("{}", "-".repeat(90));
                for request in requests {
                    println!(
                        "{:<36}  {:<12} {:>10} {:<10} {}",
                        request.id,
                        request.requested_at.format("%Y-%m-%d"),
                        format_cents(request.amount),
                        request.status,
                        truncate(&request.description, 30)
                    );
                }
            }
        }

        RequestCommands::Process {
            id,
            action,
            admin,
            note,
        } => {
            let id = parse_id(&id, "request")?;
            let action = RequestAction::from_str(&action)
                .with_context(|| format!("Invalid action '{}'. Use approve or reject", action))?;
            let admin = resolve_account(service, &admin).await?;

            let processed = service.process_request(id, action, admin.id, note).await?;
            println!(
                "Request {} {}",
                processed.request.id, processed.request.status
            );
            if let Some(transaction) = processed.transaction {
                println!(
                    "Recorded withdrawal: {} ({})",
                    format_cents(transaction.total_amount),
                    transaction.id
                );
            }
        }

        RequestCommands::Cancel { id, account } => {
            let id = parse_id(&id, "request")?;
            let account = resolve_account(service, &account).await?;
            let request = service.cancel_request(id, account.id).await?;
            println!("Cancelled request {}", request.id);
        }

        RequestCommands::Stats => {
            let stats = service.request_stats().await?;
            println!("{:<10} {:>6} {:>14}", "STATUS", "COUNT", "AMOUNT");
            println!("{}", "-".repeat(32));
            for summary in &stats.by_status {
                println!(
                    "{:<10} {:>6} {:>14}",
                    summary.status,
                    summary.count,
                    format_cents(summary.total_amount)
                );
            }
        }
    }
    Ok(())
}

async fn run_report_command(service: &LedgerService, cmd: ReportCommands) -> Result<()> {
    match cmd {
        ReportCommands::Summary { account, format } => {
            let account = resolve_account(service, &account).await?;
            let report = service.account_report(account.id).await?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            println!("Report for {} ({})", account.name, account.account_number);
            println!();
            println!(
                "  Deposits:     {:>12}  ({} transactions, {} kg)",
                format_cents(report.total_deposit),
                report.deposit_count,
                format_kg(report.total_weight_grams)
            );
            println!(
                "  Withdrawals:  {:>12}  ({} transactions)",
                format_cents(report.total_withdrawal),
                report.withdrawal_count
            );
            println!("  {}", "-".repeat(28));
            println!("  Net:          {:>12}", format_cents(report.net));
            println!();
            println!(
                "  Avg deposit:    {}",
                format_cents(report.average_deposit)
            );
            println!(
                "  Avg withdrawal: {}",
                format_cents(report.average_withdrawal)
            );
            println!(
                "  Balance:        {}",
                format_cents(report.current_balance)
            );
        }

        ReportCommands::Categories { account, format } => {
            let account = resolve_account(service, &account).await?;
            let breakdown = service.category_breakdown(account.id).await?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&breakdown)?);
                return Ok(());
            }

            if breakdown.categories.is_empty() {
                println!("No deposits found.");
                return Ok(());
            }

            println!(
                "{:<24} {:>6} {:>10} {:>12} {:>7}",
                "CATEGORY", "ITEMS", "KG", "EARNED", "%"
            );
            println!("{}", "-".repeat(63));
            for summary in &breakdown.categories {
                println!(
                    "{:<24} {:>6} {:>10} {:>12} {:>6.1}%",
                    truncate(&summary.category, 24),
                    summary.item_count,
                    format_kg(summary.weight_grams),
                    format_cents(summary.earned),
                    summary.percentage
                );
            }
            println!("{}", "-".repeat(63));
            println!(
                "{:<24} {:>6} {:>10} {:>12}",
                "Total",
                "",
                "",
                format_cents(breakdown.total_earned)
            );
        }
    }
    Ok(())
}

async fn run_check_command(service: &LedgerService) -> Result<()> {
    println!("Checking ledger integrity...\n");

    let report = service.check_integrity().await?;

    println!("Accounts:     {}", report.account_count);
    println!("Transactions: {}", report.transaction_count);
    println!("Balances:     {}", format_cents(report.total_balance));
    println!();

    if report.is_healthy() {
        println!("Ledger is consistent.");
    } else {
        println!("Issues found:");
        for issue in &report.issues {
            println!("  - {}", issue);
        }
        anyhow::bail!("Ledger integrity check failed");
    }

    Ok(())
}

async fn run_export_command(
    service: &LedgerService,
    account_id: Uuid,
    export_type: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "transactions" => {
            let count = exporter.export_transactions_csv(account_id, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} transaction(s)", count);
            }
        }
        "items" => {
            let count = exporter.export_items_csv(account_id, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} item(s)", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_account_json(account_id, writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported {} transaction(s) and {} request(s)",
                    snapshot.transactions.len(),
                    snapshot.requests.len()
                );
            }
        }
        other => anyhow::bail!(
            "Unknown export type '{}'. Valid types: transactions, items, full",
            other
        ),
    }

    Ok(())
}

fn print_transactions(transactions: &[TransactionDetail]) {
    if transactions.is_empty() {
        println!("No transactions found.");
        return;
    }

    println!(
        "{:<12} {:<10} {:>12} {:>8}  DESCRIPTION",
        "DATE", "TYPE", "AMOUNT", "KG"
    );
    println!("{}", "-".repeat(70));
    for detail in transactions {
        let transaction = &detail.transaction;
        let weight = if transaction.is_deposit() {
            format_kg(detail.total_weight())
        } else {
            String::new()
        };
        println!(
            "{:<12} {:<10} {:>12} {:>8}  {}",
            transaction.created_at.format("%Y-%m-%d"),
            transaction.transaction_type.as_str(),
            format_cents(transaction.total_amount),
            weight,
            truncate(transaction.description.as_deref().unwrap_or(""), 30)
        );
    }
}

fn print_transaction_detail(detail: &TransactionDetail) {
    let transaction = &detail.transaction;

    println!("Transaction: {}", transaction.id);
    println!("  Account:     {}", transaction.account_id);
    println!("  Type:        {}", transaction.transaction_type.as_str());
    println!("  Amount:      {}", format_cents(transaction.total_amount));
    if let Some(description) = &transaction.description {
        println!("  Description: {}", description);
    }
    println!(
        "  Created:     {}",
        transaction.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    if transaction.updated_at != transaction.created_at {
        println!(
            "  Updated:     {}",
            transaction.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    if !detail.items.is_empty() {
        println!();
        println!("  Items:");
        for line in &detail.items {
            let name = line
                .category
                .as_ref()
                .map(|c| c.name.as_str())
                .unwrap_or("?");
            println!(
                "    - {:<20} {:>8} kg  {:>10}",
                truncate(name, 20),
                format_kg(line.item.weight_grams),
                format_cents(line.item.subtotal)
            );
        }
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len - 3).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_items() {
        let items = parse_items(&["1:2".to_string(), "3: 0.5".to_string()]).unwrap();
        assert_eq!(items, vec![ItemInput::new(1, 2000), ItemInput::new(3, 500)]);
    }

    #[test]
    fn test_parse_items_rejects_malformed_lines() {
        assert!(parse_items(&["1".to_string()]).is_err());
        assert!(parse_items(&["plastic:2".to_string()]).is_err());
        assert!(parse_items(&["1:heavy".to_string()]).is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long description", 10), "a very ...");
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["wasteledger", "check"]).unwrap();
        let config = cli.ledger_config().unwrap();
        assert_eq!(config.store.busy_timeout, Duration::from_millis(5000));
    }
}
