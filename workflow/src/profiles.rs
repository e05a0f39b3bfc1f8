use std::collections::BTreeMap;
use std::str::FromStr;

/// Expected runtime of a job, in seconds.
pub const RUNTIME_KEY: &str = "runtime";
/// Name of the site-selection group a job belongs to.
pub const GROUP_KEY: &str = "group";

/// Key/value hints attached to a job or catalog entry.
/// Ordered, so anything derived from them (logs, temp files) is stable between runs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Profiles {
    entries: BTreeMap<String, String>,
}

impl Profiles {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Get the value for `key` parsed as `T`.
    /// Values that don't parse are logged and treated as missing.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match raw.trim().parse() {
            Ok(v) => Some(v),
            Err(_) => {
                log::warn!("ignoring unparseable profile value {key}={raw:?}");
                None
            }
        }
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_owned(), value.to_owned());
    }

    /// Add all of `other`'s entries, overriding ours on conflicts.
    pub fn merge(&mut self, other: &Profiles) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for Profiles {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut profiles = Self::default();
        for (k, v) in iter {
            profiles.insert(k.as_ref(), v.as_ref());
        }
        profiles
    }
}
