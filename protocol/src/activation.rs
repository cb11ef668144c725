use std::collections::BTreeMap;

/// Discriminates a live request from a notification.
pub const ACTION_KEY: &str = "action";
/// The only `action` value that asks for a new decision.
pub const ACTION_REQUEST: &str = "request";
pub const UID_KEY: &str = "uid";
pub const FROM_UID_KEY: &str = "from.uid";
pub const PID_KEY: &str = "pid";
pub const FIFO_KEY: &str = "fifo";
pub const POLICY_KEY: &str = "policy";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationValue {
    Str(String),
    Int(i64),
}

/// Named parameters supplied by whoever launched the broker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activation {
    extras: BTreeMap<String, ActivationValue>,
}

impl Activation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_str(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.put_str(key, value);
        self
    }

    pub fn with_int(mut self, key: impl Into<String>, value: i64) -> Self {
        self.put_int(key, value);
        self
    }

    /// Later values for the same key replace earlier ones.
    pub fn put_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.extras
            .insert(key.into(), ActivationValue::Str(value.into()));
    }

    pub fn put_int(&mut self, key: impl Into<String>, value: i64) {
        self.extras.insert(key.into(), ActivationValue::Int(value));
    }

    pub fn get(&self, key: &str) -> Option<&ActivationValue> {
        self.extras.get(key)
    }

    /// Returns the value only when it was supplied as a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.extras.get(key) {
            Some(ActivationValue::Str(value)) => Some(value),
            _ => None,
        }
    }

    /// Integer value of `key`, or `default` when absent or not an integer.
    ///
    /// String values are accepted when they parse as a base-10 integer so that
    /// untyped `KEY=VALUE` extras behave like typed ones.
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.extras.get(key) {
            Some(ActivationValue::Int(value)) => *value,
            Some(ActivationValue::Str(value)) => value.trim().parse().unwrap_or(default),
            None => default,
        }
    }
}
