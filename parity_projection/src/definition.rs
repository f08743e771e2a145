//! Projection definition: the declarative half of the projection.
//!
//! Options are opaque to the reducer; they are handed to the host
//! unchanged. Source streams are the `fromStreams` subscription.

use std::collections::BTreeSet;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::{AccumulationMode, EVEN_STREAM, ODD_STREAM};
use crate::error::DefinitionError;

/// Opaque string-to-string configuration passed through to the host.
///
/// Keys keep the order they were declared in; a repeated key is an error
/// when deserializing and replaces the value in place on `insert`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionOptions(Vec<(String, String)>);

impl ProjectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, returning the previous value if there was one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.0.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ProjectionOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut options = Self::new();
        for (k, v) in iter {
            options.insert(k, v);
        }
        options
    }
}

impl Serialize for ProjectionOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for ProjectionOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OptionsVisitor;

        impl<'de> Visitor<'de> for OptionsVisitor {
            type Value = ProjectionOptions;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of string options")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut options = ProjectionOptions::new();
                while let Some((key, value)) = map.next_entry::<String, String>()? {
                    if options.get(&key).is_some() {
                        return Err(de::Error::custom(format!("duplicate option `{}`", key)));
                    }
                    options.insert(key, value);
                }
                Ok(options)
            }
        }

        deserializer.deserialize_map(OptionsVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectionDefinition {
    pub name: String,
    pub options: ProjectionOptions,
    /// Subscribed streams, in declaration order.
    pub source_streams: Vec<String>,
    pub mode: AccumulationMode,
}

impl Default for ProjectionDefinition {
    /// The definition as originally declared: options
    /// `{key: "value", anotherKey: "AanotherValue"}` over `["odd", "even"]`.
    fn default() -> Self {
        let options = [("key", "value"), ("anotherKey", "AanotherValue")]
            .into_iter()
            .collect();
        Self {
            name: "parity".to_string(),
            options,
            source_streams: vec![ODD_STREAM.to_string(), EVEN_STREAM.to_string()],
            mode: AccumulationMode::default(),
        }
    }
}

impl ProjectionDefinition {
    pub fn with_mode(mut self, mode: AccumulationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_options(mut self, options: ProjectionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_source_streams<I, S>(mut self, streams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_streams = streams.into_iter().map(Into::into).collect();
        self
    }

    /// Reject definitions no host could subscribe.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::EmptyName);
        }
        if self.source_streams.is_empty() {
            return Err(DefinitionError::NoSourceStreams);
        }
        let mut seen = BTreeSet::new();
        for stream in &self.source_streams {
            if stream.is_empty() {
                return Err(DefinitionError::EmptyStreamName);
            }
            if !seen.insert(stream.as_str()) {
                return Err(DefinitionError::DuplicateStream(stream.clone()));
            }
        }
        Ok(())
    }
}
