//! Allowed categorical values for atom and bond attributes.
//!
//! Each attribute has an ordered vocabulary; a value's position is its
//! embedding index. Most vocabularies end with a `misc` bucket that absorbs
//! values never seen when the vocabulary was fixed.
//!
//! # Column order
//!
//! The encoders in [`crate::encoder`] read feature matrices column by
//! column in exactly the order of [`AtomFeature::ALL`] and
//! [`BondFeature::ALL`]:
//!
//! | column | atom attribute | bond attribute |
//! |--------|----------------|----------------|
//! | 0 | atomic number | bond type |
//! | 1 | chirality | stereo |
//! | 2 | degree | conjugation |
//! | 3 | formal charge | |
//! | 4 | number of H | |
//! | 5 | radical electrons | |
//! | 6 | hybridization | |
//! | 7 | aromaticity | |
//! | 8 | ring membership | |
//!
//! Reordering columns does not fail: it silently looks values up in the
//! wrong tables. Treat the order as part of the data contract.

use std::fmt;
use std::sync::LazyLock;

use crate::error::{Error, Result};

/// One entry of a vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureValue {
    Int(i64),
    Bool(bool),
    Name(&'static str),
    /// Catch-all for out-of-vocabulary values.
    Misc,
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Int(v) => write!(f, "{v}"),
            FeatureValue::Bool(v) => write!(f, "{v}"),
            FeatureValue::Name(v) => f.write_str(v),
            FeatureValue::Misc => f.write_str("misc"),
        }
    }
}

impl From<i64> for FeatureValue {
    fn from(v: i64) -> Self {
        FeatureValue::Int(v)
    }
}

impl From<bool> for FeatureValue {
    fn from(v: bool) -> Self {
        FeatureValue::Bool(v)
    }
}

impl From<&'static str> for FeatureValue {
    fn from(v: &'static str) -> Self {
        if v == "misc" {
            FeatureValue::Misc
        } else {
            FeatureValue::Name(v)
        }
    }
}

fn ints(range: impl Iterator<Item = i64>) -> Vec<FeatureValue> {
    range.map(FeatureValue::Int).chain([FeatureValue::Misc]).collect()
}

fn names(values: &[&'static str]) -> Vec<FeatureValue> {
    values.iter().map(|&v| FeatureValue::from(v)).collect()
}

fn bools() -> Vec<FeatureValue> {
    vec![FeatureValue::Bool(false), FeatureValue::Bool(true)]
}

static ALLOWABLE_FEATURES: LazyLock<Vec<(&'static str, Vec<FeatureValue>)>> = LazyLock::new(|| {
    vec![
        ("possible_atomic_num_list", ints(1..=118)),
        (
            "possible_chirality_list",
            names(&[
                "CHI_UNSPECIFIED",
                "CHI_TETRAHEDRAL_CW",
                "CHI_TETRAHEDRAL_CCW",
                "CHI_OTHER",
                "misc",
            ]),
        ),
        ("possible_degree_list", ints(0..=10)),
        ("possible_formal_charge_list", ints(-5..=5)),
        ("possible_numH_list", ints(0..=8)),
        ("possible_number_radical_e_list", ints(0..=4)),
        (
            "possible_hybridization_list",
            names(&["SP", "SP2", "SP3", "SP3D", "SP3D2", "misc"]),
        ),
        ("possible_is_aromatic_list", bools()),
        ("possible_is_in_ring_list", bools()),
        (
            "possible_bond_type_list",
            names(&["SINGLE", "DOUBLE", "TRIPLE", "AROMATIC", "misc"]),
        ),
        (
            "possible_bond_stereo_list",
            names(&[
                "STEREONONE",
                "STEREOZ",
                "STEREOE",
                "STEREOCIS",
                "STEREOTRANS",
                "STEREOANY",
            ]),
        ),
        ("possible_is_conjugated_list", bools()),
    ]
});

/// Vocabulary registered under `key`, e.g. `"possible_atomic_num_list"`.
pub fn vocabulary(key: &str) -> Option<&'static [FeatureValue]> {
    ALLOWABLE_FEATURES
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, values)| values.as_slice())
}

fn table(key: &'static str) -> &'static [FeatureValue] {
    vocabulary(key).unwrap_or(&[])
}

fn index_in(feature: &'static str, values: &[FeatureValue], value: FeatureValue) -> Result<usize> {
    if let Some(i) = values.iter().position(|v| *v == value) {
        return Ok(i);
    }
    values
        .iter()
        .position(|v| *v == FeatureValue::Misc)
        .ok_or_else(|| Error::UnknownFeatureValue {
            feature,
            value: value.to_string(),
        })
}

/// Atom attributes in canonical column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomFeature {
    AtomicNum,
    Chirality,
    Degree,
    FormalCharge,
    NumH,
    NumRadicalElectrons,
    Hybridization,
    IsAromatic,
    IsInRing,
}

impl AtomFeature {
    pub const ALL: [AtomFeature; 9] = [
        AtomFeature::AtomicNum,
        AtomFeature::Chirality,
        AtomFeature::Degree,
        AtomFeature::FormalCharge,
        AtomFeature::NumH,
        AtomFeature::NumRadicalElectrons,
        AtomFeature::Hybridization,
        AtomFeature::IsAromatic,
        AtomFeature::IsInRing,
    ];

    /// Name of the vocabulary table.
    pub fn key(self) -> &'static str {
        match self {
            AtomFeature::AtomicNum => "possible_atomic_num_list",
            AtomFeature::Chirality => "possible_chirality_list",
            AtomFeature::Degree => "possible_degree_list",
            AtomFeature::FormalCharge => "possible_formal_charge_list",
            AtomFeature::NumH => "possible_numH_list",
            AtomFeature::NumRadicalElectrons => "possible_number_radical_e_list",
            AtomFeature::Hybridization => "possible_hybridization_list",
            AtomFeature::IsAromatic => "possible_is_aromatic_list",
            AtomFeature::IsInRing => "possible_is_in_ring_list",
        }
    }

    pub fn vocabulary(self) -> &'static [FeatureValue] {
        table(self.key())
    }

    pub fn cardinality(self) -> usize {
        self.vocabulary().len()
    }

    /// Embedding index of `value`, falling back to `misc` when present.
    pub fn index_of(self, value: impl Into<FeatureValue>) -> Result<usize> {
        index_in(self.key(), self.vocabulary(), value.into())
    }
}

/// Bond attributes in canonical column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BondFeature {
    BondType,
    Stereo,
    IsConjugated,
}

impl BondFeature {
    pub const ALL: [BondFeature; 3] = [
        BondFeature::BondType,
        BondFeature::Stereo,
        BondFeature::IsConjugated,
    ];

    /// Name of the vocabulary table.
    pub fn key(self) -> &'static str {
        match self {
            BondFeature::BondType => "possible_bond_type_list",
            BondFeature::Stereo => "possible_bond_stereo_list",
            BondFeature::IsConjugated => "possible_is_conjugated_list",
        }
    }

    pub fn vocabulary(self) -> &'static [FeatureValue] {
        table(self.key())
    }

    pub fn cardinality(self) -> usize {
        self.vocabulary().len()
    }

    /// Embedding index of `value`, falling back to `misc` when present.
    pub fn index_of(self, value: impl Into<FeatureValue>) -> Result<usize> {
        index_in(self.key(), self.vocabulary(), value.into())
    }
}

/// Cardinality of every atom attribute, in column order.
pub fn atom_feature_dims() -> Vec<usize> {
    AtomFeature::ALL.iter().map(|f| f.cardinality()).collect()
}

/// Cardinality of every bond attribute, in column order.
pub fn bond_feature_dims() -> Vec<usize> {
    BondFeature::ALL.iter().map(|f| f.cardinality()).collect()
}

/// Map raw atom attribute values (column order) to embedding indices.
pub fn atom_to_feature_vector(values: [FeatureValue; 9]) -> Result<Vec<usize>> {
    AtomFeature::ALL
        .iter()
        .zip(values)
        .map(|(feature, value)| feature.index_of(value))
        .collect()
}

/// Map raw bond attribute values (column order) to embedding indices.
pub fn bond_to_feature_vector(values: [FeatureValue; 3]) -> Result<Vec<usize>> {
    BondFeature::ALL
        .iter()
        .zip(values)
        .map(|(feature, value)| feature.index_of(value))
        .collect()
}
