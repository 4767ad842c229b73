//! Durable key-value storage for the cart
//!
//! The cart is stored as a JSON array of lines under one fixed key. Whatever
//! sits under that key is advisory: anything that does not decode into a
//! valid cart is treated as if the key were absent.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::aggregates::{Cart, CartError, CartLine};

pub const DEFAULT_CART_KEY: &str = "cart";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error on {}: {source}", .path.display())]
    Io { path: PathBuf, #[source] source: io::Error },
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
    #[error("failed to encode cart: {0}")]
    Encode(#[from] serde_json::Error),
}

/// String key-value storage, the shape of a browser's local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> { (**self).get(key) }
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> { (**self).set(key, value) }
    fn remove(&self, key: &str) -> Result<(), StorageError> { (**self).remove(key) }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> { (**self).get(key) }
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> { (**self).set(key, value) }
    fn remove(&self, key: &str) -> Result<(), StorageError> { (**self).remove(key) }
}

/// One `<key>.json` file per key inside a state directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }
    pub fn dir(&self) -> &Path { &self.dir }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io { path: path.to_path_buf(), source }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path)(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;
        // Readers never observe a half-written file.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(io_error(&tmp))?;
        fs::rename(&tmp, &path).map_err(io_error(&path))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path)(e)),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).remove(key);
        Ok(())
    }
}

#[derive(Debug, Error)]
enum MalformedCart {
    #[error("not a cart: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] CartError),
}

/// Loads and saves the cart under a fixed key.
#[derive(Debug)]
pub struct CartStore<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> CartStore<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self { Self { store, key: key.into() } }
    pub fn store(&self) -> &S { &self.store }
    pub fn key(&self) -> &str { &self.key }

    /// Restores the stored cart. Missing, unreadable or malformed state all
    /// yield an empty cart.
    pub fn load(&self) -> Cart {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Cart::new(),
            Err(error) => {
                warn!(key = %self.key, %error, "could not read persisted cart");
                return Cart::new();
            }
        };
        match decode(&raw) {
            Ok(cart) => {
                debug!(key = %self.key, lines = cart.len(), "cart restored");
                cart
            }
            Err(error) => {
                warn!(key = %self.key, %error, "ignoring malformed persisted cart");
                Cart::new()
            }
        }
    }

    pub fn save(&self, cart: &Cart) -> Result<(), StorageError> {
        let json = serde_json::to_string(cart.lines())?;
        self.store.set(&self.key, &json)
    }

    /// Drops the stored cart entirely.
    pub fn clear(&self) -> Result<(), StorageError> { self.store.remove(&self.key) }
}

fn decode(raw: &str) -> Result<Cart, MalformedCart> {
    let lines: Vec<CartLine> = serde_json::from_str(raw)?;
    Ok(Cart::from_lines(lines)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::Product;
    use rust_decimal::Decimal;

    fn sample_cart() -> Cart {
        let mut cart = Cart::new();
        let laptop = Product::new(1u64, "Laptop", Decimal::new(1099, 2)).with_category("laptop");
        cart.add_product(&laptop).unwrap();
        cart.add_product(&laptop).unwrap();
        cart.add_product(&Product::new(2u64, "Mouse", Decimal::new(20, 0))).unwrap();
        cart
    }

    #[test]
    fn test_round_trip() {
        let store = CartStore::new(MemoryStore::new(), DEFAULT_CART_KEY);
        let cart = sample_cart();
        store.save(&cart).unwrap();
        let loaded = store.load();
        assert_eq!(loaded.lines(), cart.lines());
    }

    #[test]
    fn test_missing_key_is_empty() {
        let store = CartStore::new(MemoryStore::new(), DEFAULT_CART_KEY);
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_malformed_state_is_empty() {
        let malformed = [
            "not json",
            r#"{"id": 1}"#,
            r#"[{"id": 1, "name": "Laptop", "price": 10, "quantity": 0}]"#,
            r#"[{"id": 1, "name": "Laptop", "price": 10, "quantity": -2}]"#,
            r#"[{"id": 1, "name": "Laptop", "price": -10, "quantity": 1}]"#,
            r#"[{"id": 1, "name": "A", "price": 10, "quantity": 1}, {"id": 1, "name": "B", "price": 10, "quantity": 1}]"#,
            r#"[{"id": 1, "name": "x", "price": 5e28, "quantity": 2}]"#,
            r#"[{"id": 1, "name": "x", "price": 5e28, "quantity": 1}, {"id": 2, "name": "y", "price": 5e28, "quantity": 1}]"#,
        ];
        for raw in malformed {
            let kv = MemoryStore::new();
            kv.set(DEFAULT_CART_KEY, raw).unwrap();
            let store = CartStore::new(&kv, DEFAULT_CART_KEY);
            assert!(store.load().is_empty(), "expected empty cart for {raw}");
        }
    }

    #[test]
    fn test_overflowing_cart_loads_empty_and_prices() {
        let kv = MemoryStore::new();
        kv.set(DEFAULT_CART_KEY, r#"[{"id": 1, "name": "x", "price": 5e28, "quantity": 2}]"#).unwrap();
        let cart = CartStore::new(&kv, DEFAULT_CART_KEY).load();
        assert!(cart.is_empty());
        assert_eq!(cart.totals(&crate::Pricing::default()).total, Decimal::ZERO);
    }

    #[test]
    fn test_persisted_format() {
        let kv = MemoryStore::new();
        let store = CartStore::new(&kv, "cart");
        store.save(&sample_cart()).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&kv.get("cart").unwrap().unwrap()).unwrap();
        let lines = raw.as_array().unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[0]["quantity"], 2);
        assert_eq!(lines[0]["category"], "laptop");
    }

    #[test]
    fn test_clear_removes_key() {
        let kv = MemoryStore::new();
        let store = CartStore::new(&kv, DEFAULT_CART_KEY);
        store.save(&sample_cart()).unwrap();
        store.clear().unwrap();
        assert!(kv.get(DEFAULT_CART_KEY).unwrap().is_none());
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CartStore::new(FileStore::new(dir.path().join("state")), DEFAULT_CART_KEY);
        assert!(store.load().is_empty());
        let cart = sample_cart();
        store.save(&cart).unwrap();
        assert!(dir.path().join("state").join("cart.json").exists());
        assert_eq!(store.load().lines(), cart.lines());
        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_file_store_rejects_bad_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(matches!(store.set("../escape", "x"), Err(StorageError::InvalidKey(_))));
        assert!(matches!(store.get(""), Err(StorageError::InvalidKey(_))));
    }
}
