//! A named group of members (spec §3 Channel).
//!
//! Created lazily by the registry on first JOIN, destroyed once its member
//! set empties (spec invariant 4).

use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct Channel {
    /// Channel name without the leading `#` sigil.
    pub name: String,
    pub topic: String,
    /// Canonical-case nicknames currently in the channel. A `BTreeSet`
    /// keeps NAMES output in a stable, deterministic order.
    pub members: BTreeSet<String>,
}

impl Channel {
    pub fn new(name: String) -> Self {
        Channel {
            name,
            topic: String::new(),
            members: BTreeSet::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn names_list(&self) -> String {
        self.members
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }
}
