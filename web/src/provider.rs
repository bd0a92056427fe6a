//! EIP-1193 provider injected by browser wallets as `window.ethereum`.

use std::time::Duration;

use dbank_common::amount::{parse_quantity, to_quantity};
use dbank_common::provider::{
    ProviderError, ProviderEvent, ProviderEvents, Subscription, TxReceipt, WalletProvider,
};
use dbank_common::timer::Timer;
use futures::channel::mpsc;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::timer::GlooTimer;

#[wasm_bindgen]
extern "C" {
    #[derive(Clone, Debug)]
    pub type Ethereum;

    #[wasm_bindgen(method, catch)]
    fn request(this: &Ethereum, args: &JsValue) -> Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(method)]
    fn on(this: &Ethereum, event: &str, listener: &js_sys::Function);

    #[wasm_bindgen(method, js_name = removeListener)]
    fn remove_listener(this: &Ethereum, event: &str, listener: &js_sys::Function);
}

#[derive(Serialize)]
struct RequestArguments<'a> {
    method: &'a str,
    params: Value,
}

#[derive(Clone, Debug)]
pub struct Eip1193Provider {
    ethereum: Ethereum,
    name: String,
    poll_interval: Duration,
}

impl Eip1193Provider {
    /// The injected provider, if the page has one.
    pub fn detect(poll_interval: Duration) -> Option<Self> {
        let window = web_sys::window()?;
        let injected = js_sys::Reflect::get(&window, &JsValue::from_str("ethereum")).ok()?;
        if injected.is_undefined() || injected.is_null() {
            return None;
        }
        let is_metamask = js_sys::Reflect::get(&injected, &JsValue::from_str("isMetaMask"))
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let name = if is_metamask { "MetaMask" } else { "Injected wallet" };
        debug!(provider = name, "wallet provider detected");
        Some(Self {
            ethereum: injected.unchecked_into(),
            name: name.to_string(),
            poll_interval,
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        debug!(method, "provider request");
        let args = RequestArguments { method, params }
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        let promise = self.ethereum.request(&args).map_err(provider_error)?;
        let result = JsFuture::from(promise).await.map_err(provider_error)?;
        serde_wasm_bindgen::from_value(result)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    async fn call_string(&self, method: &str, params: Value) -> Result<String, ProviderError> {
        match self.call(method, params).await? {
            Value::String(s) => Ok(s),
            other => Err(ProviderError::InvalidResponse(format!(
                "{method} returned {other}"
            ))),
        }
    }

    async fn call_accounts(&self, method: &str) -> Result<Vec<String>, ProviderError> {
        let value = self.call(method, json!([])).await?;
        serde_json::from_value(value).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

/// EIP-1193 errors carry a numeric `code`; the 4xxx range is the wallet
/// refusing (user rejection, unauthorised, unsupported, disconnected).
fn provider_error(err: JsValue) -> ProviderError {
    let field = |name: &str| js_sys::Reflect::get(&err, &JsValue::from_str(name)).ok();
    let message = field("message")
        .and_then(|m| m.as_string())
        .or_else(|| err.as_string())
        .unwrap_or_else(|| format!("{err:?}"));
    match field("code").and_then(|c| c.as_f64()).map(|c| c as i64) {
        Some(code) if (4000..5000).contains(&code) => ProviderError::Rejected { code, message },
        Some(code) => ProviderError::Rpc(format!("{message} ({code})")),
        None => ProviderError::Rpc(message),
    }
}

fn parse_receipt(hash: &str, receipt: &Value) -> Result<TxReceipt, ProviderError> {
    let quantity = |field: &str| -> Result<Option<u128>, ProviderError> {
        match receipt.get(field).and_then(Value::as_str) {
            Some(hex) => parse_quantity(hex)
                .map(Some)
                .map_err(|e| ProviderError::InvalidResponse(format!("{field}: {e}"))),
            None => Ok(None),
        }
    };
    let status = quantity("status")?;
    let block_number = quantity("blockNumber")?.and_then(|n| u64::try_from(n).ok());
    Ok(TxReceipt {
        hash: hash.to_string(),
        block_number,
        // Pre-Byzantium receipts have no status field.
        success: status.map_or(true, |s| s == 1),
    })
}

impl WalletProvider for Eip1193Provider {
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError> {
        self.call_accounts("eth_requestAccounts").await
    }

    async fn accounts(&self) -> Result<Vec<String>, ProviderError> {
        self.call_accounts("eth_accounts").await
    }

    async fn chain_id(&self) -> Result<String, ProviderError> {
        self.call_string("eth_chainId", json!([])).await
    }

    async fn balance(&self, address: &str) -> Result<u128, ProviderError> {
        let hex = self
            .call_string("eth_getBalance", json!([address, "latest"]))
            .await?;
        parse_quantity(&hex).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    async fn send_transaction(
        &self,
        from: &str,
        to: &str,
        value_wei: u128,
    ) -> Result<String, ProviderError> {
        let tx = json!({ "from": from, "to": to, "value": to_quantity(value_wei) });
        self.call_string("eth_sendTransaction", json!([tx])).await
    }

    async fn wait_for_receipt(&self, hash: &str) -> Result<TxReceipt, ProviderError> {
        loop {
            let receipt = self
                .call("eth_getTransactionReceipt", json!([hash]))
                .await?;
            if !receipt.is_null() {
                return parse_receipt(hash, &receipt);
            }
            GlooTimer.sleep(self.poll_interval).await;
        }
    }

    fn subscribe(&self) -> Result<(Subscription, ProviderEvents), ProviderError> {
        let (tx, rx) = mpsc::unbounded();

        let accounts_tx = tx.clone();
        let on_accounts = Closure::wrap(Box::new(move |value: JsValue| {
            match serde_wasm_bindgen::from_value::<Vec<String>>(value) {
                Ok(accounts) => {
                    let _ = accounts_tx.unbounded_send(ProviderEvent::AccountsChanged(accounts));
                }
                Err(e) => warn!(error = %e, "malformed accountsChanged payload"),
            }
        }) as Box<dyn Fn(JsValue)>);

        let on_chain = Closure::wrap(Box::new(move |value: JsValue| match value.as_string() {
            Some(chain_id) => {
                let _ = tx.unbounded_send(ProviderEvent::ChainChanged(chain_id));
            }
            None => warn!("malformed chainChanged payload"),
        }) as Box<dyn Fn(JsValue)>);

        self.ethereum
            .on("accountsChanged", on_accounts.as_ref().unchecked_ref());
        self.ethereum
            .on("chainChanged", on_chain.as_ref().unchecked_ref());

        // The closures live inside the teardown until the listeners are removed.
        let ethereum = self.ethereum.clone();
        let subscription = Subscription::new(move || {
            ethereum.remove_listener("accountsChanged", on_accounts.as_ref().unchecked_ref());
            ethereum.remove_listener("chainChanged", on_chain.as_ref().unchecked_ref());
            debug!("wallet listeners removed");
        });
        Ok((subscription, rx))
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}
