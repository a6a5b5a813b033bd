//! Key-value persistence used by the phase engine.
//!
//! Writes are best-effort snapshots: implementations log failures instead of
//! returning them, and readers treat anything missing or unparsable as absent.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A scalar stored under a key.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Double(f64),
    String(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

pub trait Persistence {
    fn get_raw(&self, key: &str) -> Option<String>;
    fn set_raw(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
    fn get_blob(&self, key: &str) -> Option<Vec<u8>>;
    fn set_blob(&self, key: &str, bytes: &[u8]);

    fn set(&self, key: &str, value: Value) {
        self.set_raw(key, &value.to_string());
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        self.get_raw(key)?.trim().parse().ok()
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get_raw(key)?.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }

    fn get_double(&self, key: &str) -> Option<f64> {
        self.get_raw(key)?
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }

    fn get_string(&self, key: &str) -> Option<String> {
        self.get_raw(key)
    }
}

impl<P: Persistence + ?Sized> Persistence for Rc<P> {
    fn get_raw(&self, key: &str) -> Option<String> {
        (**self).get_raw(key)
    }

    fn set_raw(&self, key: &str, value: &str) {
        (**self).set_raw(key, value)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key)
    }

    fn get_blob(&self, key: &str) -> Option<Vec<u8>> {
        (**self).get_blob(key)
    }

    fn set_blob(&self, key: &str, bytes: &[u8]) {
        (**self).set_blob(key, bytes)
    }
}

/// In-process store, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, String>>,
    blobs: RefCell<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.borrow().contains_key(key) || self.blobs.borrow().contains_key(key)
    }
}

impl Persistence for MemoryStore {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set_raw(&self, key: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.borrow_mut().remove(key);
        self.blobs.borrow_mut().remove(key);
    }

    fn get_blob(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.borrow().get(key).cloned()
    }

    fn set_blob(&self, key: &str, bytes: &[u8]) {
        self.blobs
            .borrow_mut()
            .insert(key.to_string(), bytes.to_vec());
    }
}
