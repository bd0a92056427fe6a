//! Browser front of the dashboard: adapters for the injected wallet,
//! `localStorage` and browser timers, the composition root that wires them
//! to the session and ledger, and the JS-facing bindings.

pub mod app;
pub mod config;

#[cfg(target_family = "wasm")]
pub mod bindings;
#[cfg(target_family = "wasm")]
pub mod provider;
#[cfg(target_family = "wasm")]
pub mod storage;
#[cfg(target_family = "wasm")]
pub mod timer;

pub use app::{Dashboard, StatusLine, WalletApp};
