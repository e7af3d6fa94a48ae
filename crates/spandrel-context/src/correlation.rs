use std::collections::HashMap;

use spandrel_core::CorrelationKey;

use crate::config::CorrelationConfig;

// ---------------------------------------------------------------------------
// CorrelationContext — bounded key/value context carried across hops
// ---------------------------------------------------------------------------

/// User-supplied key/value pairs that travel with the trace. Bounded in
/// entry count and value length; an over-limit put is rejected by return
/// value, never by panicking.
#[derive(Debug, Clone)]
pub struct CorrelationContext {
    entries: HashMap<CorrelationKey, String>,
    max_entries: usize,
    max_value_size: usize,
}

impl CorrelationContext {
    pub fn new(max_entries: usize, max_value_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries,
            max_value_size,
        }
    }

    pub fn from_config(config: &CorrelationConfig) -> Self {
        Self::new(config.max_entries, config.max_value_size)
    }

    pub fn get(&self, key: &CorrelationKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Insert or overwrite an entry. Returns false without mutating when
    /// the value exceeds the size limit, or when the key is new and the
    /// context is already at capacity.
    pub fn put(&mut self, key: CorrelationKey, value: impl Into<String>) -> bool {
        let value = value.into();
        if value.len() > self.max_value_size {
            return false;
        }
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            return false;
        }
        self.entries.insert(key, value);
        true
    }

    pub fn remove(&mut self, key: &CorrelationKey) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&CorrelationKey, &str)> {
        self.entries.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ContextCarrier — what the transport layer hands over per hop
// ---------------------------------------------------------------------------

/// The decoded cross-process carrier: its correlation payload plus the
/// transport layer's verdict on whether a well-formed upstream trace
/// context was present. Header encoding and decoding happen outside this
/// workspace.
#[derive(Debug, Clone)]
pub struct ContextCarrier {
    correlation: CorrelationContext,
    valid: bool,
}

impl ContextCarrier {
    pub fn new(correlation: CorrelationContext, valid: bool) -> Self {
        Self { correlation, valid }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn correlation(&self) -> &CorrelationContext {
        &self.correlation
    }
}
