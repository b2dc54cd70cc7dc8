// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! sequence_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            Default,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Serialize,
            Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> u64 {
                self.0
            }

            #[must_use]
            pub const fn next(self) -> Self {
                Self(self.0.wrapping_add(1))
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

sequence_id!(ActivationGeneration);
sequence_id!(ProbeTaskId);

/// Opaque key of a tab inside the chat widget. Only the widget decides which
/// keys it understands. Surrounding whitespace is stripped on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TabId(String);

impl TabId {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().len() == value.len() {
            Self(value)
        } else {
            Self(value.trim().to_owned())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for TabId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TabId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<crate::ChatTab> for TabId {
    fn from(value: crate::ChatTab) -> Self {
        Self::new(value.as_str())
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{ActivationGeneration, TabId};
    use crate::ChatTab;

    #[test]
    fn generation_next_is_monotonic() {
        let first = ActivationGeneration::default();
        assert_eq!(first.get(), 0);
        assert!(first.next() > first);
        assert_eq!(first.next().next().get(), 2);
    }

    #[test]
    fn whitespace_tab_id_counts_as_empty() {
        assert!(TabId::new("").is_empty());
        assert!(TabId::new("  ").is_empty());
        assert!(!TabId::new("paa").is_empty());
    }

    #[test]
    fn surrounding_whitespace_is_stripped() {
        assert_eq!(TabId::new(" paa\t"), TabId::new("paa"));
        assert_eq!(TabId::from(String::from("pesca ")).as_str(), "pesca");
        assert_eq!(TabId::from(" sim").to_string(), "sim");
    }

    #[test]
    fn chat_tab_converts_to_its_key() {
        assert_eq!(TabId::from(ChatTab::Paa).as_str(), "paa");
        assert_eq!(TabId::from(ChatTab::Agricultura).to_string(), "agricultura");
    }
}
