use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::FACTOR_ATTRIBUTE;
use crate::errors::CoreError;

///
/// Data technology a set of profiles was generated with. `ChipSeq` and
/// `Motifs` describe factor binding, `DNase` and `H3K27ac` chromatin
/// accessibility.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Technology {
    #[serde(rename = "chipseq")]
    ChipSeq,
    #[serde(rename = "motifs")]
    Motifs,
    #[serde(rename = "DNase")]
    DNase,
    #[serde(rename = "H3K27ac")]
    H3K27ac,
}

impl Technology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Technology::ChipSeq => "chipseq",
            Technology::Motifs => "motifs",
            Technology::DNase => "DNase",
            Technology::H3K27ac => "H3K27ac",
        }
    }

    pub fn is_binding(&self) -> bool {
        matches!(self, Technology::ChipSeq | Technology::Motifs)
    }
}

impl Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Technology {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chipseq" => Ok(Technology::ChipSeq),
            "motifs" => Ok(Technology::Motifs),
            "DNase" => Ok(Technology::DNase),
            "H3K27ac" => Ok(Technology::H3K27ac),
            _ => Err(CoreError::UnknownTechnology(s.to_string())),
        }
    }
}

/// Descriptive attributes of one profile/dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactorRecord {
    pub id: String,
    pub attributes: BTreeMap<String, String>,
}

impl FactorRecord {
    pub fn factor(&self) -> &str {
        self.attributes
            .get(FACTOR_ATTRIBUTE)
            .map(|s| s.as_str())
            .unwrap_or_default()
    }
}

///
/// Read-only mapping from dataset identifier to its attributes. Every record
/// carries at least a `factor` display name. Records keep the order they were
/// loaded in.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FactorMetadata {
    records: Vec<FactorRecord>,
}

impl FactorMetadata {
    pub fn new(records: Vec<FactorRecord>) -> Result<Self, CoreError> {
        if let Some(bad) = records
            .iter()
            .find(|r| !r.attributes.contains_key(FACTOR_ATTRIBUTE))
        {
            return Err(CoreError::MissingColumn(
                FACTOR_ATTRIBUTE.to_string(),
                bad.id.clone(),
            ));
        }
        Ok(FactorMetadata { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[FactorRecord] {
        &self.records
    }

    pub fn ids(&self) -> Vec<String> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    /// Factor display names, one per record.
    pub fn factors(&self) -> Vec<String> {
        self.records.iter().map(|r| r.factor().to_string()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&FactorRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Union of attribute names over all records, `factor` first, the rest sorted.
    pub fn attribute_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .records
            .iter()
            .flat_map(|r| r.attributes.keys().cloned())
            .filter(|k| k != FACTOR_ATTRIBUTE)
            .collect();
        names.sort();
        names.dedup();
        names.insert(0, FACTOR_ATTRIBUTE.to_string());
        names
    }
}
