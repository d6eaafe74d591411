mod account;
mod catalog;
mod ledger;
mod money;
mod transaction;
mod withdrawal;

pub use account::*;
pub use catalog::*;
pub use ledger::*;
pub use money::*;
pub use transaction::*;
pub use withdrawal::*;
