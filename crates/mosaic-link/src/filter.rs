use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-identifier switch deciding which decoded messages reach handlers.
///
/// Identifiers that were never mentioned are disabled, so new message types
/// from a reconfigured receiver stay quiet until explicitly turned on.
/// Serializes as a plain `{"GPGGA": true, ...}` map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnablementFilter {
    entries: HashMap<String, bool>,
}

impl EnablementFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&mut self, identifier: impl Into<String>) {
        self.set(identifier, true);
    }

    pub fn disable(&mut self, identifier: impl Into<String>) {
        self.set(identifier, false);
    }

    pub fn set(&mut self, identifier: impl Into<String>, enabled: bool) {
        self.entries.insert(identifier.into(), enabled);
    }

    pub fn is_enabled(&self, identifier: &str) -> bool {
        self.entries.get(identifier).copied().unwrap_or(false)
    }

    /// Identifiers currently enabled, sorted.
    pub fn enabled_identifiers(&self) -> Vec<&str> {
        let mut enabled: Vec<&str> = self
            .entries
            .iter()
            .filter(|(_, on)| **on)
            .map(|(identifier, _)| identifier.as_str())
            .collect();
        enabled.sort_unstable();
        enabled
    }

    /// Number of explicit entries, enabled or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, bool)> for EnablementFilter {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_identifier_is_disabled() {
        let filter = EnablementFilter::new();
        assert!(!filter.is_enabled("GPGGA"));
    }

    #[test]
    fn explicit_entries_win() {
        let mut filter: EnablementFilter =
            [("GPGGA", true), ("GPRMC", false)].into_iter().collect();
        assert!(filter.is_enabled("GPGGA"));
        assert!(!filter.is_enabled("GPRMC"));

        filter.disable("GPGGA");
        filter.enable("4007.2");
        assert_eq!(filter.enabled_identifiers(), vec!["4007.2"]);
        assert_eq!(filter.len(), 3);
    }

    #[test]
    fn parses_from_json_map() {
        let filter: EnablementFilter =
            serde_json::from_str(r#"{"GPGGA": true, "4007.2": true, "GPGSV": false}"#).unwrap();
        assert_eq!(filter.enabled_identifiers(), vec!["4007.2", "GPGGA"]);
        assert!(!filter.is_enabled("GPGSV"));
    }
}
