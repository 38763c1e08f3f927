//! Blueprint catalog entries as returned by the simulator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::ContractError;

/// Single blueprint attribute
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlueprintAttribute {
    /// Current value
    pub value: String,

    /// Values recommended by the catalog (colors, driver ids, speeds)
    #[serde(default)]
    pub recommended_values: Vec<String>,
}

impl BlueprintAttribute {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            recommended_values: Vec::new(),
        }
    }

    pub fn with_recommended<I, S>(value: impl Into<String>, recommended: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            value: value.into(),
            recommended_values: recommended.into_iter().map(Into::into).collect(),
        }
    }
}

/// Blueprint catalog entry (e.g. "vehicle.audi.tt")
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlueprintInfo {
    pub id: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, BlueprintAttribute>,
}

impl BlueprintInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute insertion
    pub fn with_attribute(mut self, key: impl Into<String>, attr: BlueprintAttribute) -> Self {
        self.attributes.insert(key.into(), attr);
        self
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn attribute(&self, key: &str) -> Option<&BlueprintAttribute> {
        self.attributes.get(key)
    }

    /// `generation` attribute, if present and numeric
    pub fn generation(&self) -> Option<u8> {
        self.attribute("generation")?.value.parse().ok()
    }

    /// `base_type` attribute ("car", "truck", "motorcycle", ...)
    pub fn base_type(&self) -> Option<&str> {
        self.attribute("base_type").map(|a| a.value.as_str())
    }
}

/// Actor generation selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActorGeneration {
    #[default]
    All,
    Generation(u8),
}

impl ActorGeneration {
    /// Generations known to the CARLA catalog
    pub const SUPPORTED: [u8; 2] = [1, 2];

    pub fn is_supported(&self) -> bool {
        match self {
            Self::All => true,
            Self::Generation(g) => Self::SUPPORTED.contains(g),
        }
    }
}

impl FromStr for ActorGeneration {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.trim().parse::<u8>().map(Self::Generation).map_err(|_| {
            ContractError::config_validation("generation", format!("invalid generation '{s}'"))
        })
    }
}

impl fmt::Display for ActorGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Generation(g) => write!(f, "{g}"),
        }
    }
}
