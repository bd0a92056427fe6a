//! Shared fixtures for the end-to-end scenarios in `tests/`.

pub mod harness;

/// Wallet account used throughout the scenarios.
pub const ALICE: &str = "0xABC0000000000000000000000000000000000001";
/// Transfer recipient.
pub const DAVE: &str = "0xDEF0000000000000000000000000000000000004";
pub const ONE_ETH: u128 = 1_000_000_000_000_000_000;

/// Install a test subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
