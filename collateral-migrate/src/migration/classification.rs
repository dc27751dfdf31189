//! Salon classification label -> collateral classification id

use std::collections::BTreeMap;

const BUILTIN: &[(&str, &str)] = &[
    ("20208", "20208"),
    ("20401", "20401"),
    ("Company Owned Institute", "company-owned-institute"),
    ("Company Owned Salon/Spa", "company-owned-salonspa"),
    ("Concept Salon", "concept-salon"),
    ("Exclusive Destination Spa", "exclusive-destination-spa"),
    ("Exclusive Salon", "exclusive-salon"),
    ("Exclusive Spa", "exclusive-spa"),
    ("Experience Center", "experience-center"),
    ("Family Salon", "family-salon"),
    ("Ind Lifestyle Store", "ind-lifestyle-store"),
    ("Institute", "institute"),
    ("Lifestyle Salon", "lifestyle-salon"),
];

/// Immutable lookup table, loaded once per run
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationMap {
    entries: BTreeMap<String, String>,
}

impl ClassificationMap {
    /// The table shipped with the tool
    pub fn builtin() -> Self {
        Self::from_entries(
            BUILTIN
                .iter()
                .map(|(label, id)| (label.to_string(), id.to_string())),
        )
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Exact-match lookup of a classification label
    pub fn resolve(&self, label: &str) -> Option<&str> {
        self.entries.get(label).map(String::as_str)
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for ClassificationMap {
    fn default() -> Self {
        Self::builtin()
    }
}
