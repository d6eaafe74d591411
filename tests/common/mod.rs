// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use tempfile::TempDir;
use wasteledger::application::{LedgerConfig, LedgerService};
use wasteledger::domain::{Account, CategoryId, ItemInput, Role};

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    test_service_with_config(LedgerConfig::default()).await
}

pub async fn test_service_with_config(config: LedgerConfig) -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init_with_config(db_path.to_str().unwrap(), config).await?;
    Ok((service, temp_dir))
}

/// Test fixture: a user, an admin and a small catalog
pub struct Fixture {
    pub user: Account,
    pub admin: Account,
    /// 30.00 per kg
    pub plastic: CategoryId,
    /// 15.00 per kg
    pub paper: CategoryId,
    /// 10.00 per kg, so one gram is worth one cent
    pub metal: CategoryId,
}

impl Fixture {
    pub async fn create(service: &LedgerService) -> Result<Self> {
        let user = service
            .create_account("Alice", "alice@example.com", Role::User)
            .await?;
        let admin = service
            .create_account("Admin", "admin@example.com", Role::Admin)
            .await?;
        let plastic = service.create_category("Plastic", 3000).await?.id;
        let paper = service.create_category("Paper", 1500).await?.id;
        let metal = service.create_category("Metal", 1000).await?.id;
        Ok(Self {
            user,
            admin,
            plastic,
            paper,
            metal,
        })
    }

    /// Items worth exactly `cents`.
    pub fn worth(&self, cents: i64) -> Vec<ItemInput> {
        vec![ItemInput::new(self.metal, cents)]
    }

    /// Credit the user with exactly `cents` through a deposit.
    pub async fn fund_user(&self, service: &LedgerService, cents: i64) -> Result<()> {
        service
            .create_deposit(self.user.id, None, self.worth(cents))
            .await?;
        Ok(())
    }
}
