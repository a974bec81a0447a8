//! Wire schema of the product compatibility partition
//!
//! Mirrors `product_compatibility_partition.proto` field for field:
//!
//! ```text
//! message VersionsPartition {
//!   repeated Compatibility compatibility = 1;
//! }
//!
//! message Compatibility {
//!   string region = 1;
//!   string dvn = 2;
//!   repeated CatalogCompatibility catalogs = 3;
//! }
//!
//! message CatalogCompatibility {
//!   CatalogType catalog_type = 1;
//!   string hrn = 2;
//!   optional int64 min_version = 3;
//!   optional int64 max_version = 4;
//! }
//!
//! enum CatalogType {
//!   UNSPECIFIED = 0;
//!   HERE_MAP_CONTENT = 1;
//! }
//! ```
//!
//! The messages are declared with the `prost` derives directly, the way `prost-build` would
//! generate them, so no protobuf compiler is needed at build time.

/// The root message of a compatibility partition
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VersionsPartition {
    #[prost(message, repeated, tag = "1")]
    pub compatibility: Vec<Compatibility>,
}

/// The catalogs compatible with one region/dvn build
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Compatibility {
    #[prost(string, tag = "1")]
    pub region: String,
    #[prost(string, tag = "2")]
    pub dvn: String,
    #[prost(message, repeated, tag = "3")]
    pub catalogs: Vec<CatalogCompatibility>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CatalogCompatibility {
    #[prost(enumeration = "CatalogType", tag = "1")]
    pub catalog_type: i32,
    #[prost(string, tag = "2")]
    pub hrn: String,
    #[prost(int64, optional, tag = "3")]
    pub min_version: Option<i64>,
    #[prost(int64, optional, tag = "4")]
    pub max_version: Option<i64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum CatalogType {
    Unspecified = 0,
    HereMapContent = 1,
}
