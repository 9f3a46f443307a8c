// src/targets.rs

use serde::Deserialize;
use std::fmt;

/// One contract to poll, with the labels its series is published under.
///
/// Identity is the full `(name, contract, from, to)` tuple; duplicates are not
/// rejected and simply write the same series twice per tick.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct AddressTarget {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    pub contract: String,
    pub name: String,
}

impl AddressTarget {
    pub fn new(
        name: impl Into<String>,
        contract: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            contract: contract.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for AddressTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (contract={}, from={}, to={})",
            self.name, self.contract, self.from, self.to
        )
    }
}
