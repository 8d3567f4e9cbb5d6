//! Target collection names for known source keys.

use std::collections::BTreeMap;

use crate::error::{MigrationError, MigrationResult};

/// Source keys migrated when none are given explicitly.
pub const DEFAULT_SOURCE_KEYS: [&str; 3] = [
    "Data_JSON/Donnees_JSON/2025_09_21_1758483200407_0.csv",
    "Data_JSON/Google_drive_Ichtegem/2025_09_23_1758670114136_0.csv",
    "Data_JSON/Google_drive_Madeleine/2025_09_23_1758668827948_0.csv",
];

/// Derive a collection name from the second path segment of `key`, with `_` and `.` removed
/// and lower-cased: `Data_JSON/Google_drive_Ichtegem/x.csv` → `googledriveichtegem`.
pub fn derive_collection_name(key: &str) -> MigrationResult<String> {
    let segment = key
        .split('/')
        .nth(1)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| MigrationError::Naming {
            message: format!("key '{key}' has no second path segment"),
        })?;
    let name: String = segment
        .chars()
        .filter(|c| *c != '_' && *c != '.')
        .flat_map(char::to_lowercase)
        .collect();
    if name.is_empty() {
        return Err(MigrationError::Naming {
            message: format!("key '{key}' yields an empty collection name"),
        });
    }
    Ok(name)
}

/// Lookup table from known source keys to collection names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CollectionTable {
    entries: BTreeMap<String, String>,
}

impl CollectionTable {
    /// Build the table for `keys`, failing if any key cannot be named or two keys share a name.
    pub fn from_keys<I, S>(keys: I) -> MigrationResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::default();
        for key in keys {
            table.add(key.as_ref())?;
        }
        Ok(table)
    }

    /// Build the table from every key that can be named.
    ///
    /// Keys without a usable path segment, and keys whose name is already taken by an earlier
    /// key, are logged and left out; the pipeline then skips them as unknown.
    pub fn from_nameable_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::default();
        for key in keys {
            let key = key.as_ref();
            if let Err(e) = table.add(key) {
                tracing::warn!(key, err = %e, "no collection for key");
            }
        }
        table
    }

    fn add(&mut self, key: &str) -> MigrationResult<()> {
        let name = derive_collection_name(key)?;
        let owner = self.entries.iter().find(|(k, n)| **n == name && k.as_str() != key);
        if let Some((owner, _)) = owner {
            return Err(MigrationError::Naming {
                message: format!("keys '{owner}' and '{key}' both map to collection '{name}'"),
            });
        }
        self.entries.insert(key.to_string(), name);
        Ok(())
    }

    /// The default table over [`DEFAULT_SOURCE_KEYS`].
    pub fn defaults() -> MigrationResult<Self> {
        Self::from_keys(DEFAULT_SOURCE_KEYS)
    }

    /// Collection for `key`, if the key is known.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// `(key, collection)` pairs, sorted by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keys_map_to_distinct_names() {
        let table = CollectionTable::defaults().unwrap();
        assert_eq!(table.get(DEFAULT_SOURCE_KEYS[0]), Some("donneesjson"));
        assert_eq!(table.get(DEFAULT_SOURCE_KEYS[1]), Some("googledriveichtegem"));
        assert_eq!(table.get(DEFAULT_SOURCE_KEYS[2]), Some("googledrivemadeleine"));
        assert_eq!(table.get("Data_JSON/Other/x.csv"), None);
    }

    #[test]
    fn colliding_names_are_rejected() {
        let err = CollectionTable::from_keys(["a/Station_A/1.csv", "b/station.a/2.csv"]).unwrap_err();
        assert!(err.to_string().contains("both map to collection 'stationa'"));
    }

    #[test]
    fn key_without_second_segment_is_rejected() {
        assert!(derive_collection_name("flat.csv").is_err());
        assert!(derive_collection_name("a//b.csv").is_err());
    }

    #[test]
    fn nameable_keys_skip_unnamed_and_colliding_entries() {
        let table = CollectionTable::from_nameable_keys([
            "flat.csv",
            "a/Station_A/1.csv",
            "b/station.a/2.csv",
            "a/Station_B/1.csv",
        ]);
        assert_eq!(table.get("flat.csv"), None);
        assert_eq!(table.get("a/Station_A/1.csv"), Some("stationa"));
        assert_eq!(table.get("b/station.a/2.csv"), None);
        assert_eq!(table.get("a/Station_B/1.csv"), Some("stationb"));
    }

    #[test]
    fn repeated_key_is_not_a_collision() {
        let table = CollectionTable::from_keys(["a/B/1.csv", "a/B/1.csv"]).unwrap();
        assert_eq!(table.iter().count(), 1);
    }
}
