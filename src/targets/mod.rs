//! Target components under attack.

pub mod lender;
pub mod token;
pub mod vault;

pub use lender::{LenderPool, PoolCall};
pub use token::{TokenCall, TokenLedger};
pub use vault::{VaultCall, VaultLogic, VaultProxy, WAITING_PERIOD, WITHDRAWAL_LIMIT};
