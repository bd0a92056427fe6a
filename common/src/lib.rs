pub mod amount;
pub mod config;
pub mod error;
pub mod format;
pub mod ledger;
pub mod network;
pub mod provider;
pub mod session;
pub mod store;
pub mod timer;
pub mod transaction;
pub mod transfer;

#[cfg(any(test, feature = "dev"))]
pub mod mock;

pub use config::WalletConfig;
pub use error::{LedgerError, SessionError, TransferError};
pub use ledger::{Ledger, LedgerFilter};
pub use provider::{ProviderError, ProviderEvent, WalletProvider};
pub use session::{Session, SessionState, WalletSession};
pub use store::KeyValueStore;
pub use transaction::{TransactionKind, TransactionRecord, TransactionStatus};
pub use transfer::{TransferRequest, TransferService};
