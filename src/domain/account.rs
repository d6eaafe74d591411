use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

pub type AccountId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Deposits waste, withdraws, files withdrawal requests
    User,
    /// Manages the catalog and processes withdrawal requests
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    /// Ten digit number printed on the member's savings book
    pub account_number: String,
    pub role: Role,
    /// Accrued balance; only ever written by the ledger engine
    pub balance: Cents,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            account_number: generate_account_number(),
            role,
            balance: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// The acting identity of this account.
    pub fn actor(&self) -> Actor {
        Actor {
            account_id: self.id,
            role: self.role,
        }
    }
}

/// Who is performing a ledger mutation. Authentication happens upstream;
/// the engine only decides policy from this pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub account_id: AccountId,
    pub role: Role,
}

impl Actor {
    pub fn new(account_id: AccountId, role: Role) -> Self {
        Self { account_id, role }
    }

    /// Owners and admins may touch a record.
    pub fn can_manage(&self, owner: AccountId) -> bool {
        self.role.is_admin() || self.account_id == owner
    }
}

/// Random ten digit account number. Uniqueness is enforced by the store.
pub fn generate_account_number() -> String {
    let mut rng = rand::thread_rng();
    (0..10)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
