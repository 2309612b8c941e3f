use std::collections::HashMap;

use bytes::Bytes;

/// registry of named resources bundled with the application, typically
/// populated from `include_bytes!` statics at startup.
///
/// a leading slash in resource names is ignored on both insert and lookup,
/// so `/assets/app.css` and `assets/app.css` address the same entry.
#[derive(Clone, Default)]
pub struct Resources {
    entries: HashMap<String, Bytes>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// register resource bytes under the given name.
    pub fn insert(mut self, name: &str, bytes: impl Into<Bytes>) -> Self {
        self.entries.insert(name.trim_start_matches('/').to_owned(), bytes.into());
        self
    }

    /// cheap clone of the bytes registered under the given name.
    pub fn get(&self, name: &str) -> Option<Bytes> {
        self.entries.get(name.trim_start_matches('/')).cloned()
    }
}
