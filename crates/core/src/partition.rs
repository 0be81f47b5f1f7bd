//! Named cache partitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// A named, durable request-to-response store.
///
/// The storage name of each partition is fixed; changing one would orphan
/// every entry written under the old name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Styles,
    Scripts,
    Markup,
    Templates,
    Data,
    Api,
    Miscellaneous,
}

impl Partition {
    /// Every partition the engine knows about. This is the eviction list used
    /// by the activation sweep and the budget check.
    pub const ALL: [Partition; 7] = [
        Partition::Styles,
        Partition::Scripts,
        Partition::Markup,
        Partition::Templates,
        Partition::Data,
        Partition::Miscellaneous,
        Partition::Api,
    ];

    /// Partitions holding the HTML shell and JSON config, refreshed on a
    /// tighter schedule.
    pub const CRUCIAL: [Partition; 2] = [Partition::Data, Partition::Markup];

    /// Storage name of the partition.
    pub fn name(self) -> &'static str {
        match self {
            Partition::Styles => "app-css",
            Partition::Scripts => "app-js",
            Partition::Markup => "app-html",
            Partition::Templates => "app-hbs",
            Partition::Data => "app-json",
            Partition::Api => "app-api",
            Partition::Miscellaneous => "app-other",
        }
    }

    /// Resolve a storage name back to a partition.
    ///
    /// Returns `None` for names this engine does not own.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn is_crucial(self) -> bool {
        Self::CRUCIAL.contains(&self)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Partition {
    type Err = Error;

    /// Accepts either the storage name (`app-css`) or the short name (`styles`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(p) = Self::from_name(s) {
            return Ok(p);
        }
        match s.to_ascii_lowercase().as_str() {
            "styles" => Ok(Partition::Styles),
            "scripts" => Ok(Partition::Scripts),
            "markup" => Ok(Partition::Markup),
            "templates" => Ok(Partition::Templates),
            "data" => Ok(Partition::Data),
            "api" => Ok(Partition::Api),
            "miscellaneous" => Ok(Partition::Miscellaneous),
            _ => Err(Error::InvalidInput(format!("unknown partition: {s}"))),
        }
    }
}
