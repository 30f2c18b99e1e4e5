use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// A column of the output table, declared in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "telephone")]
    Telephone,
    #[serde(rename = "faxNumber")]
    FaxNumber,
    #[serde(rename = "addressLocality")]
    AddressLocality,
    #[serde(rename = "addressRegion")]
    AddressRegion,
    #[serde(rename = "addressCountry")]
    AddressCountry,
    #[serde(rename = "url")]
    Url,
    #[serde(rename = "source_url")]
    SourceUrl,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Name,
        Field::Telephone,
        Field::FaxNumber,
        Field::AddressLocality,
        Field::AddressRegion,
        Field::AddressCountry,
        Field::Url,
        Field::SourceUrl,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Telephone => "telephone",
            Self::FaxNumber => "faxNumber",
            Self::AddressLocality => "addressLocality",
            Self::AddressRegion => "addressRegion",
            Self::AddressCountry => "addressCountry",
            Self::Url => "url",
            Self::SourceUrl => "source_url",
        }
    }

    /// Whether the value lives in the entity's `address` object.
    pub fn in_address(self) -> bool {
        matches!(
            self,
            Self::AddressLocality | Self::AddressRegion | Self::AddressCountry
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| {
                let known = Field::ALL.map(Field::as_str).join(", ");
                anyhow!("Unknown field {s:?}, expected one of: {known}")
            })
    }
}

/// Selected output columns. Iteration always follows [`Field::ALL`] order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSet(BTreeSet<Field>);

impl FieldSet {
    pub fn all() -> Self {
        Self(Field::ALL.into_iter().collect())
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.iter().copied()
    }

    pub fn headers(&self) -> Vec<&'static str> {
        self.iter().map(Field::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for FieldSet {
    fn default() -> Self {
        [
            Field::Name,
            Field::Telephone,
            Field::AddressLocality,
            Field::SourceUrl,
        ]
        .into_iter()
        .collect()
    }
}

impl FromIterator<Field> for FieldSet {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for FieldSet {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = s
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::parse)
            .collect::<anyhow::Result<FieldSet>>()?;
        if fields.is_empty() {
            anyhow::bail!("No field selected");
        }
        Ok(fields)
    }
}

impl fmt::Display for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.headers().join(","))
    }
}
