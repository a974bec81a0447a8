//! Pure lookups over a [`PartitionIndex`]
use compat_cache::{CatalogInterval, CatalogType, CompatibilityEntry, PartitionIndex};
use serde::Serialize;

/// A region build compatible with the queried catalog version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForwardMatch {
    pub region: String,
    pub dvn: String,
}

impl ForwardMatch {
    fn from_entry(entry: &CompatibilityEntry) -> Self {
        Self {
            region: entry.region.clone(),
            dvn: entry.dvn.clone(),
        }
    }
}

/// One compatibility interval of a region build, bounds passed through as published
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReverseRow {
    pub region: String,
    pub dvn: String,
    #[serde(flatten)]
    pub interval: CatalogInterval,
}

/// The intervals of one region, as produced by [`group_by_region`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionCatalogs<C = CatalogInterval> {
    pub region: String,
    pub catalogs: Vec<C>,
}

/// Region builds whose intervals contain `version`
///
/// Without `target_hrn` every matching entry is reported once. With `target_hrn` only intervals
/// of that catalog qualify and an entry is reported once per qualifying interval.
pub fn forward_lookup(
    index: &PartitionIndex,
    version: i64,
    region: Option<&str>,
    target_hrn: Option<&str>,
) -> Vec<ForwardMatch> {
    forward_matches(index, version, region, target_hrn, |_| true)
}

/// [`forward_lookup`] restricted to intervals of `HERE_MAP_CONTENT` catalogs
pub fn hmc_lookup(
    index: &PartitionIndex,
    version: i64,
    region: Option<&str>,
    target_hrn: Option<&str>,
) -> Vec<ForwardMatch> {
    forward_matches(index, version, region, target_hrn, |interval| {
        interval.catalog_type == CatalogType::HereMapContent
    })
}

fn forward_matches(
    index: &PartitionIndex,
    version: i64,
    region: Option<&str>,
    target_hrn: Option<&str>,
    qualifies: impl Fn(&CatalogInterval) -> bool,
) -> Vec<ForwardMatch> {
    let mut matches = vec![];
    for entry in index.entries().iter().filter(|e| e.in_region(region)) {
        let mut hits = entry
            .catalogs
            .iter()
            .filter(|i| qualifies(i) && i.contains(version));
        match target_hrn {
            Some(hrn) => {
                let count = hits.filter(|i| i.hrn == hrn).count();
                matches.extend(std::iter::repeat_n(ForwardMatch::from_entry(entry), count));
            }
            None => {
                if hits.next().is_some() {
                    matches.push(ForwardMatch::from_entry(entry));
                }
            }
        }
    }
    matches
}

/// Every interval of the entries built as `dvn`, one row per interval
pub fn reverse_lookup(index: &PartitionIndex, dvn: &str, region: Option<&str>) -> Vec<ReverseRow> {
    index
        .entries()
        .iter()
        .filter(|e| e.dvn == dvn && e.in_region(region))
        .flat_map(|e| {
            e.catalogs.iter().map(|interval| ReverseRow {
                region: e.region.clone(),
                dvn: e.dvn.clone(),
                interval: interval.clone(),
            })
        })
        .collect()
}

/// Group reverse rows by region, keeping regions in the order they first appear
pub fn group_by_region(rows: Vec<ReverseRow>) -> Vec<RegionCatalogs> {
    let mut groups: Vec<RegionCatalogs> = vec![];
    for row in rows {
        match groups.iter_mut().find(|g| g.region == row.region) {
            Some(group) => group.catalogs.push(row.interval),
            None => groups.push(RegionCatalogs {
                region: row.region,
                catalogs: vec![row.interval],
            }),
        }
    }
    groups
}
