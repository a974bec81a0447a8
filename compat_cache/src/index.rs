//! The decoded, immutable compatibility index of one catalog version
use prost::Message;
use serde::{Serialize, Serializer};

use crate::schema;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed compatibility partition: {0}")]
    Malformed(#[from] prost::DecodeError),

    #[error("compatibility entry #{entry} has no {field}")]
    MissingField { entry: usize, field: &'static str },

    #[error("catalog #{catalog} of compatibility entry #{entry} has no {field}")]
    MissingCatalogField {
        entry: usize,
        catalog: usize,
        field: &'static str,
    },
}

/// The kind of catalog a [`CatalogInterval`] refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogType {
    HereMapContent,
    Unspecified,
    /// A value this build does not know about, passed through as is
    Other(i32),
}

impl CatalogType {
    fn from_wire(value: i32) -> Self {
        if value == schema::CatalogType::HereMapContent as i32 {
            Self::HereMapContent
        } else if value == schema::CatalogType::Unspecified as i32 {
            Self::Unspecified
        } else {
            Self::Other(value)
        }
    }

    pub fn wire_value(&self) -> i32 {
        match self {
            Self::HereMapContent => schema::CatalogType::HereMapContent as i32,
            Self::Unspecified => schema::CatalogType::Unspecified as i32,
            Self::Other(value) => *value,
        }
    }

    /// The protobuf enum name, for known values
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            Self::HereMapContent => Some("HERE_MAP_CONTENT"),
            Self::Unspecified => Some("UNSPECIFIED"),
            Self::Other(_) => None,
        }
    }
}

impl Serialize for CatalogType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_str() {
            Some(name) => serializer.serialize_str(name),
            None => serializer.serialize_i32(self.wire_value()),
        }
    }
}

/// An inclusive range of versions of the catalog `hrn`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogInterval {
    pub catalog_type: CatalogType,
    pub hrn: String,
    /// Absent means `0`
    pub min_version: Option<i64>,
    /// Absent means unbounded above
    pub max_version: Option<i64>,
}

impl CatalogInterval {
    pub fn lower_bound(&self) -> i64 {
        self.min_version.unwrap_or(0)
    }

    pub fn upper_bound(&self) -> i64 {
        self.max_version.unwrap_or(i64::MAX)
    }

    /// Whether `version` lies in `[min_version, max_version]`
    pub fn contains(&self, version: i64) -> bool {
        (self.lower_bound()..=self.upper_bound()).contains(&version)
    }
}

/// The catalogs compatible with one region's build `dvn`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityEntry {
    /// Always upper case
    pub region: String,
    pub dvn: String,
    pub catalogs: Vec<CatalogInterval>,
}

impl CompatibilityEntry {
    /// Case-insensitive region match; `None` matches every region
    pub fn in_region(&self, region: Option<&str>) -> bool {
        region.is_none_or(|r| self.region.eq_ignore_ascii_case(r))
    }
}

/// Every [`CompatibilityEntry`] of a partition, in partition order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionIndex {
    entries: Vec<CompatibilityEntry>,
}

impl PartitionIndex {
    pub fn new(entries: Vec<CompatibilityEntry>) -> Self {
        Self { entries }
    }

    /// Decode a `VersionsPartition` payload
    ///
    /// Entries without a region or dvn and catalogs without an HRN are rejected rather than
    /// skipped, so a truncated partition never replaces a complete one.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let partition = schema::VersionsPartition::decode(bytes)?;
        let entries = partition
            .compatibility
            .into_iter()
            .enumerate()
            .map(|(entry, c)| {
                if c.region.is_empty() {
                    return Err(DecodeError::MissingField {
                        entry,
                        field: "region",
                    });
                }
                if c.dvn.is_empty() {
                    return Err(DecodeError::MissingField {
                        entry,
                        field: "dvn",
                    });
                }
                let catalogs = c
                    .catalogs
                    .into_iter()
                    .enumerate()
                    .map(|(catalog, cc)| {
                        if cc.hrn.is_empty() {
                            return Err(DecodeError::MissingCatalogField {
                                entry,
                                catalog,
                                field: "hrn",
                            });
                        }
                        Ok(CatalogInterval {
                            catalog_type: CatalogType::from_wire(cc.catalog_type),
                            hrn: cc.hrn,
                            min_version: cc.min_version,
                            max_version: cc.max_version,
                        })
                    })
                    .collect::<Result<_, _>>()?;
                Ok(CompatibilityEntry {
                    region: c.region.to_uppercase(),
                    dvn: c.dvn,
                    catalogs,
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CompatibilityEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
