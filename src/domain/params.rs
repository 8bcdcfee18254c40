use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{FlexVersionError, Result};

/// Named parameters captured from the version source and mutated by bump
/// actions. Values are kept as strings; numeric bumps parse them on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParameterSet {
    values: IndexMap<String, String>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|v| v.as_str())
    }

    /// Set a parameter, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Add a parameter that must not already exist.
    pub fn insert_new(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        match self.values.entry(name.into()) {
            Entry::Occupied(entry) => Err(FlexVersionError::config(format!(
                "Parameter '{}' was captured more than once",
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                entry.insert(value.into());
                Ok(())
            }
        }
    }

    /// Add every captured parameter, failing on the first duplicate.
    pub fn extend_new<I, K, V>(&mut self, captures: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in captures {
            self.insert_new(name, value)?;
        }
        Ok(())
    }

    /// The integer value of a parameter, or `None` when it is absent or blank.
    pub fn get_int(&self, name: &str) -> Result<Option<i64>> {
        match self.get(name).map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse::<i64>().map(Some).map_err(|_| {
                FlexVersionError::numeric(format!(
                    "Parameter '{}' has value '{}', which is not an integer",
                    name, raw
                ))
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_map(&self) -> &IndexMap<String, String> {
        &self.values
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut set = ParameterSet::new();
        for (k, v) in iter {
            set.set(k, v);
        }
        set
    }
}
