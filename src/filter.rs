//! Filter manager: user-supplied predicates applied at two
//! points -- resource admission (per-collector RIB throttling) and
//! record/elem emission (an early-out hierarchy: project, collector,
//! router, and time interval at the record level; peer, community, and
//! prefix at the elem level).
//!
//! Splits admission-time filtering out from emission-time filtering, and
//! adds dimensions a flat predicate list doesn't naturally distinguish:
//! project, collector, router, and a per-(project, collector) RIB period.

use crate::models::network::address::Prefix;
use crate::models::record::Record;
use crate::models::{Community, Elem};
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// One (start, end) unix-time-seconds window, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInterval {
    pub start: u32,
    pub end: u32,
}

impl TimeInterval {
    pub const fn contains(&self, time_sec: u32) -> bool {
        time_sec >= self.start && time_sec <= self.end
    }
}

/// All-vs-any semantics for the community predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommunityMatch {
    /// elem must carry every configured community.
    All,
    /// elem must carry at least one configured community.
    Any,
}

/// The filter dimensions `add_filter` accepts.
#[derive(Debug, Clone)]
pub enum FilterDimension {
    Project(String),
    Collector(String),
    Router(String),
    PeerAsn(u32),
    PeerIp(String),
    /// Matches only the exact prefix.
    PrefixExact(String),
    /// Matches the prefix or any more/less specific covering prefix.
    PrefixAny(String),
    /// Matches the prefix or any less-specific (covering) prefix.
    PrefixLess(String),
    Community(Community),
    TimeInterval(u32, u32),
    /// Minimum seconds between admitted RIBs for a given (project, collector).
    RibPeriod(u32),
    /// Elem's rendered AS_PATH (space-separated ASNs, `{}`/`()`/`[]` segment
    /// bracketing) must match this regex.
    AsPathRegex(String),
}

#[derive(Default)]
pub struct FilterManager {
    projects: HashSet<String>,
    collectors: HashSet<String>,
    routers: HashSet<String>,
    peer_asns: HashSet<u32>,
    peer_ips: HashSet<String>,
    prefix_exact: Vec<Prefix>,
    prefix_any: Vec<Prefix>,
    prefix_less: Vec<Prefix>,
    communities: Vec<Community>,
    community_match: CommunityMatch,
    time_intervals: Vec<TimeInterval>,
    rib_period: u32,
    last_rib_time: HashMap<(String, String), u32>,
    as_path_regexes: Vec<Regex>,
}

impl FilterManager {
    pub fn new() -> Self {
        FilterManager {
            community_match: CommunityMatch::Any,
            ..Default::default()
        }
    }

    pub fn add_filter(&mut self, dimension: FilterDimension) -> crate::error::ParserResult<()> {
        use crate::error::ParserError;
        match dimension {
            FilterDimension::Project(p) => {
                self.projects.insert(p);
            }
            FilterDimension::Collector(c) => {
                self.collectors.insert(c);
            }
            FilterDimension::Router(r) => {
                self.routers.insert(r);
            }
            FilterDimension::PeerAsn(a) => {
                self.peer_asns.insert(a);
            }
            FilterDimension::PeerIp(ip) => {
                self.peer_ips.insert(ip);
            }
            FilterDimension::PrefixExact(p) => {
                let prefix: Prefix = p
                    .parse()
                    .map_err(|_| ParserError::Filter(format!("malformed prefix {}", p)))?;
                self.prefix_exact.push(prefix);
            }
            FilterDimension::PrefixAny(p) => {
                let prefix: Prefix = p
                    .parse()
                    .map_err(|_| ParserError::Filter(format!("malformed prefix {}", p)))?;
                self.prefix_any.push(prefix);
            }
            FilterDimension::PrefixLess(p) => {
                let prefix: Prefix = p
                    .parse()
                    .map_err(|_| ParserError::Filter(format!("malformed prefix {}", p)))?;
                self.prefix_less.push(prefix);
            }
            FilterDimension::Community(c) => self.communities.push(c),
            FilterDimension::TimeInterval(start, end) => {
                if start > end {
                    return Err(ParserError::Filter(format!(
                        "time interval start {} after end {}",
                        start, end
                    )));
                }
                self.time_intervals.push(TimeInterval { start, end });
            }
            FilterDimension::RibPeriod(period) => self.rib_period = period,
            FilterDimension::AsPathRegex(pattern) => {
                let re = Regex::new(&pattern)
                    .map_err(|e| ParserError::Filter(format!("bad as-path regex {}: {}", pattern, e)))?;
                self.as_path_regexes.push(re);
            }
        }
        Ok(())
    }

    pub fn set_community_match(&mut self, mode: CommunityMatch) {
        self.community_match = mode;
    }

    /// C7's per-collector RIB throttle: admit unless this is a RIB for a
    /// `(project, collector)` seen within `rib_period` of its last admitted
    /// RIB. Advances the watermark as a side effect of an admitted RIB.
    pub fn admit_rib(&mut self, project: &str, collector: &str, time: u32) -> bool {
        if self.rib_period == 0 {
            return true;
        }
        let key = (project.to_string(), collector.to_string());
        match self.last_rib_time.get(&key) {
            Some(&last) if time < last.saturating_add(self.rib_period) => false,
            _ => {
                self.last_rib_time.insert(key, time);
                true
            }
        }
    }

    /// Record-level early-outs: project, collector, router, time interval.
    /// Peer/prefix/community dimensions have no representation on a bare
    /// [`Record`] (they live in the payload the elem generator unfolds), so
    /// they are re-checked per-elem by [`FilterManager::matches_elem`].
    pub fn matches_record(&self, record: &Record) -> bool {
        if !self.projects.is_empty() && !self.projects.contains(&record.project_name) {
            return false;
        }
        if !self.collectors.is_empty() && !self.collectors.contains(&record.collector_name) {
            return false;
        }
        if !self.routers.is_empty() {
            match &record.router_name {
                Some(r) if self.routers.contains(r) => {}
                _ => return false,
            }
        }
        if !self.time_intervals.is_empty()
            && !self
                .time_intervals
                .iter()
                .any(|iv| iv.contains(record.time_sec))
        {
            return false;
        }
        true
    }

    /// Elem-level early-outs, checked in this order: peer-ASN,
    /// peer-IP, communities, prefix (exact / any / less-specific).
    pub fn matches_elem(&self, elem: &Elem) -> bool {
        if !self.peer_asns.is_empty() && !self.peer_asns.contains(&elem.peer_asn.to_u32()) {
            return false;
        }
        if !self.peer_ips.is_empty() && !self.peer_ips.contains(&elem.peer_ip.to_string()) {
            return false;
        }
        if !self.communities.is_empty() {
            let matched = match self.community_match {
                CommunityMatch::All => self
                    .communities
                    .iter()
                    .all(|c| elem.communities.contains(c)),
                CommunityMatch::Any => self
                    .communities
                    .iter()
                    .any(|c| elem.communities.contains(c)),
            };
            if !matched {
                return false;
            }
        }
        if !self.prefix_exact.is_empty() || !self.prefix_any.is_empty() || !self.prefix_less.is_empty()
        {
            let Some(prefix) = elem.prefix else {
                return false;
            };
            let exact_ok = self.prefix_exact.is_empty()
                || self.prefix_exact.iter().any(|p| *p == prefix);
            let any_ok = self.prefix_any.is_empty()
                || self
                    .prefix_any
                    .iter()
                    .any(|p| *p == prefix || p.covers(&prefix) || p.covered_by(&prefix));
            let less_ok = self.prefix_less.is_empty()
                || self.prefix_less.iter().any(|p| p.covers(&prefix));
            if !(exact_ok && any_ok && less_ok) {
                return false;
            }
        }
        if !self.as_path_regexes.is_empty() {
            let rendered = match &elem.as_path {
                Some(path) => path.to_string(),
                None => return false,
            };
            if !self.as_path_regexes.iter().any(|re| re.is_match(&rendered)) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s2_rib_throttling_admits_per_schedule() {
        let mut filters = FilterManager::new();
        filters.add_filter(FilterDimension::RibPeriod(600)).unwrap();

        let times = [1000, 1200, 1700, 1900, 2300];
        let admitted: Vec<u32> = times
            .iter()
            .copied()
            .filter(|&t| filters.admit_rib("p", "c", t))
            .collect();
        assert_eq!(admitted, vec![1000, 1700, 2300]);
    }

    #[test]
    fn rib_period_zero_admits_everything() {
        let mut filters = FilterManager::new();
        for t in [100, 100, 100] {
            assert!(filters.admit_rib("p", "c", t));
        }
    }

    #[test]
    fn empty_sets_do_not_filter() {
        let filters = FilterManager::new();
        let elem = Elem::new(
            crate::models::ElemType::Announcement,
            "192.0.2.1".parse().unwrap(),
            crate::models::Asn::new(65000),
        );
        assert!(filters.matches_elem(&elem));
    }

    #[test]
    fn peer_asn_set_rejects_non_members() {
        let mut filters = FilterManager::new();
        filters
            .add_filter(FilterDimension::PeerAsn(65000))
            .unwrap();
        let matching = Elem::new(
            crate::models::ElemType::Announcement,
            "192.0.2.1".parse().unwrap(),
            crate::models::Asn::new(65000),
        );
        let other = Elem::new(
            crate::models::ElemType::Announcement,
            "192.0.2.1".parse().unwrap(),
            crate::models::Asn::new(65001),
        );
        assert!(filters.matches_elem(&matching));
        assert!(!filters.matches_elem(&other));
    }

    #[test]
    fn prefix_exact_vs_any_matching() {
        let mut filters = FilterManager::new();
        filters
            .add_filter(FilterDimension::PrefixExact("10.0.0.0/24".into()))
            .unwrap();
        let mut elem = Elem::new(
            crate::models::ElemType::Announcement,
            "192.0.2.1".parse().unwrap(),
            crate::models::Asn::new(65000),
        );
        elem.prefix = Some("10.0.0.0/25".parse().unwrap());
        assert!(!filters.matches_elem(&elem)); // not an exact match

        let mut filters_any = FilterManager::new();
        filters_any
            .add_filter(FilterDimension::PrefixAny("10.0.0.0/24".into()))
            .unwrap();
        assert!(filters_any.matches_elem(&elem)); // more-specific, covered
    }

    #[test]
    fn as_path_regex_matches_rendered_path() {
        use crate::models::AsPathSegment;

        let mut filters = FilterManager::new();
        filters
            .add_filter(FilterDimension::AsPathRegex("^65001 65002$".into()))
            .unwrap();

        let mut elem = Elem::new(
            crate::models::ElemType::Announcement,
            "192.0.2.1".parse().unwrap(),
            crate::models::Asn::new(65000),
        );
        let mut path = crate::models::AsPath::new();
        path.append_segment(AsPathSegment::Sequence(vec![
            crate::models::Asn::new(65001),
            crate::models::Asn::new(65002),
        ]));
        elem.as_path = Some(path);
        assert!(filters.matches_elem(&elem));

        elem.as_path = None;
        assert!(!filters.matches_elem(&elem));
    }

    #[test]
    fn malformed_as_path_regex_is_rejected() {
        let mut filters = FilterManager::new();
        assert!(filters
            .add_filter(FilterDimension::AsPathRegex("(unterminated".into()))
            .is_err());
    }
}
