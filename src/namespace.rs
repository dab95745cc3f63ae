//! One-to-one map between namespace URIs and short prefixes.

use crate::model::QName;
use ahash::AHashMap;
use compact_str::{format_compact, CompactString};
use std::collections::BTreeMap;

/// Allocates prefixes for namespace URIs.
///
/// A preferred prefix is used when it is still free; otherwise a number is
/// appended to it (or to `ns`) until the result is unused. Once a namespace has
/// a prefix it keeps it for the lifetime of the map.
#[derive(Debug, Clone, Default)]
pub struct NamespaceMap {
    nsmap: AHashMap<Option<CompactString>, CompactString>,
    prefixmap: BTreeMap<CompactString, Option<CompactString>>,
}

impl NamespaceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_prefix(&mut self, ns: Option<&str>, preferred: Option<&str>) -> CompactString {
        let key = ns.map(CompactString::new);
        if let Some(prefix) = self.nsmap.get(&key) {
            return prefix.clone();
        }

        let prefix = match preferred {
            Some(p) if !p.is_empty() && !self.prefixmap.contains_key(p) => CompactString::new(p),
            _ => {
                let base = preferred.filter(|p| !p.is_empty()).unwrap_or("ns");
                let mut n = 0usize;
                loop {
                    let candidate = format_compact!("{}{}", base, n);
                    if !self.prefixmap.contains_key(&candidate) {
                        break candidate;
                    }
                    n += 1;
                }
            }
        };

        self.prefixmap.insert(prefix.clone(), key.clone());
        self.nsmap.insert(key, prefix.clone());
        prefix
    }

    /// Prefix for a namespace that is always present.
    #[inline]
    pub fn prefix_for(&mut self, ns: &str, preferred: Option<&str>) -> CompactString {
        self.get_prefix(Some(ns), preferred)
    }

    /// `prefix:localName`, using the qname's own prefix as the preference.
    pub fn qname(&mut self, qname: &QName) -> String {
        let prefix = self.get_prefix(qname.namespace.as_deref(), qname.prefix.as_deref());
        format!("{}:{}", prefix, qname.local_name)
    }

    pub fn len(&self) -> usize {
        self.prefixmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixmap.is_empty()
    }

    /// Prefix to namespace table, ordered by prefix.
    pub fn prefixes(&self) -> BTreeMap<String, Option<String>> {
        self.prefixmap
            .iter()
            .map(|(p, ns)| (p.to_string(), ns.as_ref().map(|s| s.to_string())))
            .collect()
    }
}
