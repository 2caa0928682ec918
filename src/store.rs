//! Key-value storage backends.
//!
//! The extension persists everything through `chrome.storage`, a flat async
//! map of string keys to JSON values. [`KeyValueStore`] is that contract;
//! [`BrowserStore`] talks to the real thing through `storage.js` and
//! [`MemoryStore`] stands in for it in tests.

use crate::error::StorageError;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::prelude::*;

/// A batch of key/value pairs, as read from or written to the store
pub type Items = IndexMap<String, Value>;

#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    /// `Ok(None)` when the key is not set.
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    async fn get_all(&self) -> Result<Items, StorageError>;

    /// Write every pair in one call, replacing existing values wholesale.
    async fn set(&self, items: Items) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        (**self).get(key).await
    }

    async fn get_all(&self) -> Result<Items, StorageError> {
        (**self).get_all().await
    }

    async fn set(&self, items: Items) -> Result<(), StorageError> {
        (**self).set(items).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key).await
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Rc<S> {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        (**self).get(key).await
    }

    async fn get_all(&self) -> Result<Items, StorageError> {
        (**self).get_all().await
    }

    async fn set(&self, items: Items) -> Result<(), StorageError> {
        (**self).set(items).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key).await
    }
}

/// Store operations, used to aim injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Get,
    GetAll,
    Set,
    Remove,
}

impl StoreOp {
    fn name(self) -> &'static str {
        match self {
            StoreOp::Get => "get",
            StoreOp::GetAll => "get_all",
            StoreOp::Set => "set",
            StoreOp::Remove => "remove",
        }
    }
}

/// In-process store with the same semantics as `chrome.storage`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RefCell<Items>,
    fail_next: Cell<Option<StoreOp>>,
    set_calls: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `op` fail once.
    pub fn fail_next(&self, op: StoreOp) {
        self.fail_next.set(Some(op));
    }

    /// Number of successful `set` calls so far.
    pub fn set_calls(&self) -> usize {
        self.set_calls.get()
    }

    pub fn snapshot(&self) -> Items {
        self.items.borrow().clone()
    }

    fn check(&self, op: StoreOp) -> Result<(), StorageError> {
        if self.fail_next.get() == Some(op) {
            self.fail_next.set(None);
            return Err(StorageError::backend(op.name(), "injected failure"));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        self.check(StoreOp::Get)?;
        Ok(self.items.borrow().get(key).cloned())
    }

    async fn get_all(&self) -> Result<Items, StorageError> {
        self.check(StoreOp::GetAll)?;
        Ok(self.items.borrow().clone())
    }

    async fn set(&self, items: Items) -> Result<(), StorageError> {
        self.check(StoreOp::Set)?;
        self.items.borrow_mut().extend(items);
        self.set_calls.set(self.set_calls.get() + 1);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check(StoreOp::Remove)?;
        self.items.borrow_mut().shift_remove(key);
        Ok(())
    }
}

// Import JS bridge functions
#[wasm_bindgen(module = "/storage.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getStorage(area: &str, key: Option<String>) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(area: &str, items: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn removeStorage(area: &str, key: &str) -> Result<(), JsValue>;
}

/// Which `chrome.storage` area to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageArea {
    #[default]
    Sync,
    Local,
}

impl StorageArea {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageArea::Sync => "sync",
            StorageArea::Local => "local",
        }
    }
}

/// `chrome.storage` through the `storage.js` bridge
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserStore {
    area: StorageArea,
}

impl BrowserStore {
    pub fn new(area: StorageArea) -> Self {
        BrowserStore { area }
    }
}

fn js_error(operation: &'static str, error: JsValue) -> StorageError {
    let message = error
        .as_string()
        .or_else(|| {
            error
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{:?}", error));
    StorageError::backend(operation, message)
}

fn from_js(operation: &'static str, value: JsValue) -> Result<Value, StorageError> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| StorageError::backend(operation, format!("Failed to parse storage: {}", e)))
}

impl KeyValueStore for BrowserStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let value = getStorage(self.area.as_str(), Some(key.to_string()))
            .await
            .map_err(|e| js_error("get", e))?;

        if value.is_null() || value.is_undefined() {
            Ok(None)
        } else {
            from_js("get", value).map(Some)
        }
    }

    async fn get_all(&self) -> Result<Items, StorageError> {
        let value = getStorage(self.area.as_str(), None)
            .await
            .map_err(|e| js_error("get_all", e))?;

        if value.is_null() || value.is_undefined() {
            return Ok(Items::new());
        }
        serde_wasm_bindgen::from_value(value)
            .map_err(|e| StorageError::backend("get_all", format!("Failed to parse storage: {}", e)))
    }

    async fn set(&self, items: Items) -> Result<(), StorageError> {
        // Plain objects, not JS Maps, or chrome.storage drops the contents
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        let items_js = items
            .serialize(&serializer)
            .map_err(|e| StorageError::backend("set", format!("Failed to serialize storage: {}", e)))?;

        setStorage(self.area.as_str(), items_js)
            .await
            .map_err(|e| js_error("set", e))
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        removeStorage(self.area.as_str(), key)
            .await
            .map_err(|e| js_error("remove", e))
    }
}
