use dbank_common::WalletConfig;
use tracing::warn;

/// Settings baked in at compile time.
///
/// `DBANK_CONFIG` may hold a full JSON document; the single-field variables
/// override whatever it sets.
#[allow(dead_code)] // used in WASM builds
pub fn web_config() -> WalletConfig {
    build_config(
        option_env!("DBANK_CONFIG"),
        option_env!("DBANK_LEDGER_KEY"),
        option_env!("DBANK_BANK_DELAY_MS"),
    )
}

fn build_config(
    json: Option<&str>,
    ledger_key: Option<&str>,
    bank_delay_ms: Option<&str>,
) -> WalletConfig {
    let mut config = json
        .and_then(|json| match WalletConfig::from_json(json) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(error = %e, "ignoring malformed DBANK_CONFIG");
                None
            }
        })
        .unwrap_or_default();

    if let Some(key) = ledger_key.filter(|k| !k.is_empty()) {
        config.ledger_key = key.to_string();
    }
    if let Some(ms) = bank_delay_ms {
        match ms.parse() {
            Ok(ms) => config.bank_transfer_delay_ms = ms,
            Err(_) => warn!(value = ms, "ignoring non-numeric DBANK_BANK_DELAY_MS"),
        }
    }
    config
}
