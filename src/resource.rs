//! Resource model and manager: a typed description of one
//! obtainable data source, and an overlap-aware ordered queue of them
//! grouped by start time.
//!
//! Groups are kept in a `BTreeMap` keyed by start time rather than a
//! doubly-linked list threaded through borrowed `next` pointers, so lookup
//! and in-order iteration don't require unsafe aliasing.

use std::collections::{BTreeMap, HashMap};

/// Sentinel `duration` value denoting a live, unbounded stream.
pub const FOREVER: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    File,
    Kafka,
    Cache,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    Mrt,
    Bmp,
    RisLive,
}

/// A resource is either a RIB dump or an UPDATE stream; never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKindFilter {
    Rib,
    Update,
}

#[derive(Debug, Clone)]
pub struct Resource {
    pub transport_kind: TransportKind,
    pub format_kind: FormatKind,
    pub uri: String,
    pub initial_time: u32,
    pub duration: u32,
    pub project: String,
    pub collector: String,
    pub router: Option<String>,
    pub record_type: RecordKindFilter,
    pub attributes: HashMap<String, String>,
}

impl Resource {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transport_kind: TransportKind,
        format_kind: FormatKind,
        uri: String,
        initial_time: u32,
        duration: u32,
        project: impl Into<String>,
        collector: impl Into<String>,
        record_type: RecordKindFilter,
    ) -> Self {
        Resource {
            transport_kind,
            format_kind,
            uri,
            initial_time,
            duration,
            project: project.into(),
            collector: collector.into(),
            router: None,
            record_type,
            attributes: HashMap::new(),
        }
    }

    pub fn with_router(mut self, router: impl Into<String>) -> Self {
        self.router = Some(router.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn is_live(&self) -> bool {
        self.duration == FOREVER
    }
}

struct Group {
    rib: Vec<Resource>,
    update: Vec<Resource>,
    overlap_start: i64,
    overlap_end: i64,
}

impl Group {
    fn new(time: u32) -> Self {
        Group {
            rib: Vec::new(),
            update: Vec::new(),
            overlap_start: time as i64,
            overlap_end: time as i64,
        }
    }
}

/// Ordered, overlap-grouped queue of pending resources. Head is the oldest
/// group; `get_batch` extracts a prefix of mutually-overlapping groups.
#[derive(Default)]
pub struct ResourceManager {
    groups: BTreeMap<u32, Group>,
}

impl ResourceManager {
    pub fn new() -> Self {
        ResourceManager {
            groups: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Inserts `resource` into the group sharing its start time, creating a
    /// new group if needed. A RIB resource can pull the group's
    /// `overlap_start` earlier to account for backdating.
    pub fn push(&mut self, resource: Resource) {
        let time = resource.initial_time;
        let duration = resource.duration;
        let is_rib = resource.record_type == RecordKindFilter::Rib;

        let group = self.groups.entry(time).or_insert_with(|| Group::new(time));

        let end_candidate = if duration == FOREVER {
            i64::MAX
        } else {
            time as i64 + duration as i64
        };
        group.overlap_end = group.overlap_end.max(end_candidate);

        if is_rib {
            let start_candidate = (time as i64).saturating_sub(duration as i64);
            group.overlap_start = group.overlap_start.min(start_candidate);
            group.rib.push(resource);
        } else {
            group.update.push(resource);
        }
    }

    /// Extracts the head group and every subsequent group whose
    /// `overlap_start` is reached by the running `last_overlap_end`, RIBs
    /// before UPDATEs within each group, insertion order within a kind.
    /// Returns an empty vec if the manager holds no resources.
    pub fn get_batch(&mut self) -> Vec<Resource> {
        let mut included = Vec::new();
        let mut last_overlap_end = i64::MIN;
        let mut first = true;

        for (&time, group) in self.groups.iter() {
            if first {
                included.push(time);
                last_overlap_end = group.overlap_end;
                first = false;
                continue;
            }
            if last_overlap_end > group.overlap_start {
                included.push(time);
                last_overlap_end = last_overlap_end.max(group.overlap_end);
            } else {
                break;
            }
        }

        let mut batch = Vec::new();
        for time in included {
            if let Some(group) = self.groups.remove(&time) {
                batch.extend(group.rib);
                batch.extend(group.update);
            }
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(time: u32, duration: u32, kind: RecordKindFilter) -> Resource {
        Resource::new(
            TransportKind::File,
            FormatKind::Mrt,
            format!("file:///{}", time),
            time,
            duration,
            "routeviews",
            "route-views2",
            kind,
        )
    }

    #[test]
    fn queue_monotonicity_after_arbitrary_pushes() {
        let mut mgr = ResourceManager::new();
        for time in [500, 100, 900, 300, 700] {
            mgr.push(resource(time, 60, RecordKindFilter::Update));
        }
        let times: Vec<u32> = mgr.groups.keys().copied().collect();
        let mut sorted = times.clone();
        sorted.sort_unstable();
        assert_eq!(times, sorted);
        assert!(times.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn s1_rib_and_update_same_start_time_batch_together_rib_first() {
        let mut mgr = ResourceManager::new();
        mgr.push(resource(1_000_000, 3600, RecordKindFilter::Rib));
        mgr.push(resource(1_000_000, 900, RecordKindFilter::Update));

        let batch = mgr.get_batch();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].record_type, RecordKindFilter::Rib);
        assert_eq!(batch[1].record_type, RecordKindFilter::Update);
        assert!(mgr.is_empty());
    }

    #[test]
    fn overlapping_groups_are_batched_together() {
        let mut mgr = ResourceManager::new();
        // group at t=100 overlaps [100, 400); group at t=300 starts inside it.
        mgr.push(resource(100, 300, RecordKindFilter::Update));
        mgr.push(resource(300, 300, RecordKindFilter::Update));
        // group at t=900 starts well after 400, does not overlap.
        mgr.push(resource(900, 300, RecordKindFilter::Update));

        let batch = mgr.get_batch();
        assert_eq!(batch.len(), 2);
        assert!(mgr.len() == 1);
    }

    #[test]
    fn rib_backdating_extends_group_overlap_start() {
        let mut mgr = ResourceManager::new();
        // RIB at t=1000 with duration=500 backdates overlap_start to 500,
        // so a group starting at t=600 should be pulled into the same batch
        // as long as the running overlap_end still reaches past it.
        mgr.push(resource(1000, 2000, RecordKindFilter::Rib));
        mgr.push(resource(1000, 100, RecordKindFilter::Update));

        let batch = mgr.get_batch();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn get_batch_on_empty_manager_returns_empty() {
        let mut mgr = ResourceManager::new();
        assert!(mgr.get_batch().is_empty());
    }

    #[test]
    fn live_resource_has_unbounded_overlap_end() {
        let mut mgr = ResourceManager::new();
        mgr.push(resource(100, FOREVER, RecordKindFilter::Update));
        mgr.push(resource(1_000_000_000, 60, RecordKindFilter::Update));
        // a FOREVER-duration resource's group overlaps everything after it.
        let batch = mgr.get_batch();
        assert_eq!(batch.len(), 2);
    }
}
