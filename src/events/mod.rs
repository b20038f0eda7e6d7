//! Splicing event detection over the exon/junction relation graph.
//!
//! [`JunctionAggregator`] owns the item index, the parsed regions and the
//! graph for one session. Each detector walks the graph read-only and returns
//! an [`EventTable`].

pub mod isoforms;
pub mod mutually_exclusive;
pub mod skipped_exon;
pub mod table;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use log::{info, trace};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::graph::{ItemId, ItemIndex, ItemSet, RelationGraph, Triple};
use crate::types::Region;

pub use isoforms::annotate_isoforms;
pub use table::{EventRow, EventTable, EVENT_ID_SEP};

/// Progress is logged every this many `exon1` candidates.
const PROGRESS_EVERY: usize = 10_000;

/// Candidate events of one detector: exon tuple -> junction set per junction role.
///
/// Re-detecting the same exon tuple overwrites the previous entry.
pub type CandidateEvents = BTreeMap<Vec<ItemId>, Vec<ItemSet>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    SkippedExon,
    MutuallyExclusiveExon,
    Alt5pSpliceSite,
    Alt3pSpliceSite,
    AltFirstExon,
    AltLastExon,
}

impl EventKind {
    pub fn abbreviation(self) -> &'static str {
        match self {
            EventKind::SkippedExon => "se",
            EventKind::MutuallyExclusiveExon => "mxe",
            EventKind::Alt5pSpliceSite => "a5ss",
            EventKind::Alt3pSpliceSite => "a3ss",
            EventKind::AltFirstExon => "afe",
            EventKind::AltLastExon => "ale",
        }
    }

    pub fn exon_columns(self) -> &'static [&'static str] {
        match self {
            EventKind::SkippedExon => &["exon1", "exon2", "exon3"],
            EventKind::MutuallyExclusiveExon => &["exon1", "exon2", "exon3", "exon4"],
            _ => &[],
        }
    }

    pub fn junction_columns(self) -> &'static [&'static str] {
        match self {
            EventKind::SkippedExon => &["junction12", "junction23", "junction13"],
            EventKind::MutuallyExclusiveExon => {
                &["junction13", "junction34", "junction12", "junction24"]
            }
            _ => &[],
        }
    }

    /// Positions (in the exon tuple) of the exons of isoform 1 and isoform 2.
    ///
    /// Isoform 2 always carries exon2; isoform 1 skips it (SE) or uses exon3 instead (MXE).
    pub fn isoform_exons(self) -> (&'static [usize], &'static [usize]) {
        match self {
            EventKind::SkippedExon => (&[0, 2], &[0, 1, 2]),
            EventKind::MutuallyExclusiveExon => (&[0, 2, 3], &[0, 1, 3]),
            _ => (&[], &[]),
        }
    }

    /// Positions of the exons each isoform must not contain.
    pub fn isoform_excluded_exons(self) -> (&'static [usize], &'static [usize]) {
        match self {
            EventKind::SkippedExon => (&[1], &[]),
            EventKind::MutuallyExclusiveExon => (&[1], &[2]),
            _ => (&[], &[]),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::SkippedExon => "skipped exon",
            EventKind::MutuallyExclusiveExon => "mutually exclusive exon",
            EventKind::Alt5pSpliceSite => "alternative 5' splice site",
            EventKind::Alt3pSpliceSite => "alternative 3' splice site",
            EventKind::AltFirstExon => "alternative first exon",
            EventKind::AltLastExon => "alternative last exon",
        };
        f.write_str(s)
    }
}

/// Combines splice junctions into splicing events.
///
/// Built once from a triple table; all detectors share it read-only.
#[derive(Debug, Clone)]
pub struct JunctionAggregator {
    items: ItemIndex,
    regions: Vec<Region>,
    exons: Vec<ItemId>,
    junctions: Vec<ItemId>,
    graph: RelationGraph,
}

impl JunctionAggregator {
    /// Item universe = the exons and junctions named by `triples`
    /// (exons first, each group in first-seen order).
    pub fn new(triples: &[Triple]) -> Result<Self> {
        let exons: Vec<&str> = triples.iter().map(|t| t.exon.as_str()).collect();
        let junctions: Vec<&str> = triples.iter().map(|t| t.junction.as_str()).collect();
        Self::with_universe(triples, &exons, &junctions)
    }

    /// Build over an explicit universe; a triple naming anything else fails the build.
    pub fn with_universe<S: AsRef<str>>(
        triples: &[Triple],
        exon_ids: &[S],
        junction_ids: &[S],
    ) -> Result<Self> {
        let items = ItemIndex::from_items(
            exon_ids
                .iter()
                .map(|s| s.as_ref())
                .chain(junction_ids.iter().map(|s| s.as_ref())),
        );

        let regions = items
            .names()
            .iter()
            .map(|name| name.parse::<Region>())
            .collect::<Result<Vec<_>>>()?;

        let exons = dedup_ids(&items, exon_ids)?;
        let junctions = dedup_ids(&items, junction_ids)?;

        let graph = RelationGraph::build(&items, triples)?;

        info!(
            "Built relation graph: {} exons, {} junctions, {} relations",
            exons.len(),
            junctions.len(),
            graph.n_relations()
        );

        Ok(Self {
            items,
            regions,
            exons,
            junctions,
            graph,
        })
    }

    pub fn items(&self) -> &ItemIndex {
        &self.items
    }

    pub fn graph(&self) -> &RelationGraph {
        &self.graph
    }

    pub fn exons(&self) -> &[ItemId] {
        &self.exons
    }

    pub fn junctions(&self) -> &[ItemId] {
        &self.junctions
    }

    pub fn region(&self, id: ItemId) -> &Region {
        &self.regions[id]
    }

    pub fn name(&self, id: ItemId) -> &str {
        self.items.name(id)
    }

    pub fn alt_5p_splice_site(&self) -> Result<EventTable> {
        Err(Error::NotImplemented(EventKind::Alt5pSpliceSite))
    }

    pub fn alt_3p_splice_site(&self) -> Result<EventTable> {
        Err(Error::NotImplemented(EventKind::Alt3pSpliceSite))
    }

    pub fn alt_first_exon(&self) -> Result<EventTable> {
        Err(Error::NotImplemented(EventKind::AltFirstExon))
    }

    pub fn alt_last_exon(&self) -> Result<EventTable> {
        Err(Error::NotImplemented(EventKind::AltLastExon))
    }

    /// Run `check` for every exon as `exon1`, in parallel, and merge the results.
    pub(crate) fn collect_events<F>(&self, kind: EventKind, check: F) -> CandidateEvents
    where
        F: Fn(ItemId, &mut CandidateEvents) + Sync,
    {
        let n_exons = self.exons.len();
        let done = AtomicUsize::new(0);
        info!("Trying out {} exons for {} events...", n_exons, kind);

        let events = self
            .exons
            .par_iter()
            .fold(CandidateEvents::new, |mut acc, &exon1| {
                check(exon1, &mut acc);
                let n = done.fetch_add(1, AtomicOrdering::Relaxed) + 1;
                if n % PROGRESS_EVERY == 0 {
                    info!("\t{}/{} exons tested", n, n_exons);
                }
                acc
            })
            .reduce(CandidateEvents::new, |mut a, b| {
                a.extend(b);
                a
            });

        info!("Found {} {} events", events.len(), kind);
        events
    }

    /// Order two candidate exons by start; `None` if they overlap.
    pub(crate) fn ordered_pair(&self, a: ItemId, b: ItemId) -> Option<(ItemId, ItemId)> {
        let (ra, rb) = (self.region(a), self.region(b));
        if ra.overlaps(rb) {
            trace!("{} overlaps {}", ra.name, rb.name);
            return None;
        }
        match ra.cmp_start(rb) {
            Ordering::Greater => Some((b, a)),
            _ => Some((a, b)),
        }
    }

    /// Exons strictly increasing by start and pairwise disjoint.
    pub(crate) fn is_ordered_chain(&self, exons: &[ItemId]) -> bool {
        let increasing = exons
            .windows(2)
            .all(|w| self.region(w[0]).start < self.region(w[1]).start);
        let disjoint = exons.iter().enumerate().all(|(i, &a)| {
            exons[i + 1..]
                .iter()
                .all(|&b| !self.region(a).overlaps(self.region(b)))
        });
        increasing && disjoint
    }

    /// Turn candidate events into a table with item names.
    pub(crate) fn to_table(&self, kind: EventKind, events: CandidateEvents) -> EventTable {
        let rows = events
            .into_iter()
            .map(|(exons, junctions)| {
                let exons: Vec<String> = exons.iter().map(|&e| self.name(e).to_string()).collect();
                let junctions: Vec<Vec<String>> = junctions
                    .iter()
                    .map(|set| set.iter().map(|&j| self.name(j).to_string()).collect())
                    .collect();
                EventRow::new(exons, junctions)
            })
            .collect();
        EventTable::new(kind, rows)
    }
}

/// Unordered pairs of `set`, in index order.
pub(crate) fn pairs(set: &ItemSet) -> Vec<(ItemId, ItemId)> {
    let v: Vec<ItemId> = set.iter().copied().collect();
    let mut out = Vec::with_capacity(v.len() * v.len().saturating_sub(1) / 2);
    for (i, &a) in v.iter().enumerate() {
        for &b in &v[i + 1..] {
            out.push((a, b));
        }
    }
    out
}

fn dedup_ids<S: AsRef<str>>(items: &ItemIndex, names: &[S]) -> Result<Vec<ItemId>> {
    let mut seen = ItemSet::new();
    let mut out = Vec::new();
    for name in names {
        let id = items.resolve(name.as_ref())?;
        if seen.insert(id) {
            out.push(id);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction::{Downstream, Upstream};

    #[test]
    fn unimplemented_detectors_say_so() {
        let triples = vec![
            Triple::new("chr1:201-299:+", "exon:chr1:100-200:+", Upstream),
            Triple::new("chr1:201-299:+", "exon:chr1:300-400:+", Downstream),
        ];
        let agg = JunctionAggregator::new(&triples).unwrap();

        assert!(matches!(
            agg.alt_5p_splice_site(),
            Err(Error::NotImplemented(EventKind::Alt5pSpliceSite))
        ));
        assert!(matches!(
            agg.alt_3p_splice_site(),
            Err(Error::NotImplemented(EventKind::Alt3pSpliceSite))
        ));
        assert!(matches!(agg.alt_first_exon(), Err(Error::NotImplemented(EventKind::AltFirstExon))));
        assert!(matches!(agg.alt_last_exon(), Err(Error::NotImplemented(EventKind::AltLastExon))));
    }

    #[test]
    fn universe_puts_exons_before_junctions() {
        let triples = vec![
            Triple::new("chr1:201-299:+", "exon:chr1:100-200:+", Upstream),
            Triple::new("chr1:201-299:+", "exon:chr1:300-400:+", Downstream),
        ];
        let agg = JunctionAggregator::new(&triples).unwrap();

        assert_eq!(agg.exons(), &[0, 1]);
        assert_eq!(agg.junctions(), &[2]);
        assert_eq!(agg.name(2), "chr1:201-299:+");
        assert_eq!(agg.region(0).stop, 200);
    }

    #[test]
    fn unknown_triple_items_fail_fast() {
        let triples = vec![Triple::new("chr1:201-299:+", "exon:chr1:100-200:+", Upstream)];
        let err = JunctionAggregator::with_universe(
            &triples,
            &["exon:chr1:300-400:+"],
            &["chr1:201-299:+"],
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownItem(_)));
    }

    #[test]
    fn unparsable_item_ids_fail_fast() {
        let triples = vec![Triple::new("junction-a", "exon-b", Upstream)];
        assert!(matches!(
            JunctionAggregator::new(&triples),
            Err(Error::InvalidRegion { .. })
        ));
    }

    #[test]
    fn ordered_pair_sorts_by_start_and_rejects_overlaps() {
        let triples = vec![
            Triple::new("chr1:201-299:+", "exon:chr1:300-400:+", Downstream),
            Triple::new("chr1:201-299:+", "exon:chr1:100-200:+", Upstream),
            Triple::new("chr1:201-299:+", "exon:chr1:350-450:+", Downstream),
        ];
        let agg = JunctionAggregator::new(&triples).unwrap();

        assert_eq!(agg.ordered_pair(0, 1), Some((1, 0)));
        assert_eq!(agg.ordered_pair(1, 0), Some((1, 0)));
        assert_eq!(agg.ordered_pair(0, 2), None);
        assert!(agg.is_ordered_chain(&[1, 0]));
        assert!(!agg.is_ordered_chain(&[0, 1]));
        assert!(!agg.is_ordered_chain(&[1, 0, 2]));
    }

    #[test]
    fn pairs_are_unordered_and_unique() {
        let set = ItemSet::from([4, 1, 9]);
        assert_eq!(pairs(&set), vec![(1, 4), (1, 9), (4, 9)]);
        assert!(pairs(&ItemSet::from([3])).is_empty());
    }
}
