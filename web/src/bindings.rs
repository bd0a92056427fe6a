//! JS-facing handle for the hosting page.

use std::rc::Rc;

use dbank_common::ledger::LedgerFilter;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};

use crate::app::WalletApp;
use crate::config::web_config;
use crate::provider::Eip1193Provider;
use crate::storage::LocalStorageStore;
use crate::timer::GlooTimer;

type BrowserApp = WalletApp<Eip1193Provider, LocalStorageStore, GlooTimer>;

fn clog(msg: &str) {
    web_sys::console::log_1(&msg.into());
}

fn to_js<V: Serialize>(value: &V) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub struct DbankApp {
    app: Rc<BrowserApp>,
}

#[wasm_bindgen]
impl DbankApp {
    #[wasm_bindgen(constructor)]
    pub fn new() -> DbankApp {
        let config = web_config();
        let provider = Eip1193Provider::detect(config.receipt_poll_interval());
        if provider.is_none() {
            clog("[DBANK] no injected wallet found");
        }
        DbankApp {
            app: Rc::new(WalletApp::new(provider, LocalStorageStore, GlooTimer, config)),
        }
    }

    /// Load stored transactions, start listening to the wallet and try a
    /// silent reconnect.
    pub fn start(&self) {
        if let Some(pump) = self.app.start() {
            spawn_local(pump);
        }
        let app = self.app.clone();
        spawn_local(async move { app.restore().await });
    }

    /// Resolves to the dashboard view; rejects with the status message.
    pub fn connect(&self) -> js_sys::Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            match app.connect().await {
                Ok(_) => to_js(&app.dashboard()),
                Err(e) => Err(JsValue::from_str(&e.status_message())),
            }
        })
    }

    pub fn disconnect(&self) {
        self.app.disconnect();
    }

    pub fn send(&self, to: String, amount: String, description: String) -> js_sys::Promise {
        let app = self.app.clone();
        future_to_promise(async move { to_js(&app.send(&to, &amount, &description).await) })
    }

    #[wasm_bindgen(js_name = bankTransfer)]
    pub fn bank_transfer(
        &self,
        to: String,
        amount: String,
        description: String,
    ) -> js_sys::Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            to_js(&app.bank_transfer(&to, &amount, &description).await)
        })
    }

    pub fn dashboard(&self) -> Result<JsValue, JsValue> {
        to_js(&self.app.dashboard())
    }

    /// `filter` is `{ kind?, status?, search? }` or undefined.
    pub fn transactions(&self, filter: JsValue) -> Result<JsValue, JsValue> {
        let filter: LedgerFilter = if filter.is_undefined() || filter.is_null() {
            LedgerFilter::default()
        } else {
            serde_wasm_bindgen::from_value(filter).map_err(|e| JsValue::from_str(&e.to_string()))?
        };
        to_js(&self.app.transactions(&filter))
    }

    #[wasm_bindgen(js_name = clearStatus)]
    pub fn clear_status(&self) {
        self.app.clear_status();
    }

    pub fn shutdown(&self) {
        self.app.shutdown();
    }
}

impl Default for DbankApp {
    fn default() -> Self {
        Self::new()
    }
}
