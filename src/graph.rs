//! Item index and the symmetric exon/junction relation graph.
//!
//! Exons and junctions share one index space. A relation `a -d-> b` is always
//! stored together with its mirror `b -opposite(d)-> a`, so asking "who points
//! at `b` along `d`" is the same as following `opposite(d)` out of `b`.

use std::collections::{BTreeSet, HashMap};

use log::debug;
use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};
use crate::types::Direction;

/// Index of an exon or junction in the shared item space.
pub type ItemId = usize;

pub type ItemSet = BTreeSet<ItemId>;

/// One row of the triple table: `exon` lies `direction` of `junction`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub junction: String,
    pub exon: String,
    pub direction: Direction,
}

impl Triple {
    pub fn new(junction: impl Into<String>, exon: impl Into<String>, direction: Direction) -> Self {
        Self {
            junction: junction.into(),
            exon: exon.into(),
            direction,
        }
    }
}

/// Bijection between item strings and dense integer ids.
#[derive(Debug, Clone, Default)]
pub struct ItemIndex {
    names: Vec<String>,
    by_name: HashMap<String, ItemId>,
}

impl ItemIndex {
    /// Intern items in first-seen order; repeated names keep their first id.
    pub fn from_items<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut idx = Self::default();
        for item in items {
            idx.intern(item.as_ref());
        }
        idx
    }

    fn intern(&mut self, name: &str) -> ItemId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = self.names.len();
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn get(&self, name: &str) -> Option<ItemId> {
        self.by_name.get(name).copied()
    }

    /// Like `get`, but an unknown name is an error.
    pub fn resolve(&self, name: &str) -> Result<ItemId> {
        self.get(name).ok_or_else(|| Error::UnknownItem(name.to_string()))
    }

    /// Name of an item. Panics on an id this index never handed out.
    pub fn name(&self, id: ItemId) -> &str {
        &self.names[id]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Per item, per direction: the set of related items.
#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    out: Vec<[ItemSet; 2]>,
}

impl RelationGraph {
    pub fn with_items(n_items: usize) -> Self {
        Self {
            out: vec![Default::default(); n_items],
        }
    }

    /// Build the graph for `triples` over an existing item index.
    ///
    /// Every exon and junction named by a triple must already be in `items`.
    pub fn build(items: &ItemIndex, triples: &[Triple]) -> Result<Self> {
        let mut graph = Self::with_items(items.len());

        for t in triples {
            let exon_i = items.resolve(&t.exon)?;
            let junction_i = items.resolve(&t.junction)?;

            debug!("{} is {} of {}", t.exon, t.direction, t.junction);
            debug!("{} is {} of {}", t.junction, t.direction.opposite(), t.exon);

            graph.store(exon_i, t.direction, junction_i);
        }

        Ok(graph)
    }

    /// Store `a -d-> b` and its mirror `b -opposite(d)-> a`.
    pub fn store(&mut self, a: ItemId, d: Direction, b: ItemId) {
        let need = a.max(b) + 1;
        if self.out.len() < need {
            self.out.resize_with(need, Default::default);
        }
        self.out[a][d.slot()].insert(b);
        self.out[b][d.opposite().slot()].insert(a);
    }

    /// Items `b` with `a -d-> b`.
    pub fn targets(&self, a: ItemId, d: Direction) -> &ItemSet {
        static EMPTY: ItemSet = BTreeSet::new();
        self.out.get(a).map(|slots| &slots[d.slot()]).unwrap_or(&EMPTY)
    }

    /// Items `a` with `a -d-> b`, answered through the mirror edges.
    pub fn sources(&self, d: Direction, b: ItemId) -> &ItemSet {
        self.targets(b, d.opposite())
    }

    pub fn has_relation(&self, a: ItemId, d: Direction, b: ItemId) -> bool {
        self.targets(a, d).contains(&b)
    }

    /// One hop along `d` from every item of `from` (union).
    pub fn hop(&self, from: &ItemSet, d: Direction) -> ItemSet {
        from.iter()
            .flat_map(|&a| self.targets(a, d).iter().copied())
            .collect()
    }

    /// Follow `dirs` hop by hop starting at `start`.
    pub fn walk(&self, start: ItemId, dirs: &[Direction]) -> ItemSet {
        let mut frontier = ItemSet::from([start]);
        for &d in dirs {
            frontier = self.hop(&frontier, d);
            if frontier.is_empty() {
                break;
            }
        }
        frontier
    }

    /// Items reached from `a` along `da` and from `b` along `db`.
    pub fn common(&self, a: ItemId, da: Direction, b: ItemId, db: Direction) -> ItemSet {
        self.targets(a, da)
            .intersection(self.targets(b, db))
            .copied()
            .collect()
    }

    /// All stored relations `(a, d, b)`, mirrors included.
    pub fn relations(&self) -> impl Iterator<Item = (ItemId, Direction, ItemId)> + '_ {
        self.out.iter().enumerate().flat_map(|(a, slots)| {
            Direction::ALL
                .into_iter()
                .flat_map(move |d| slots[d.slot()].iter().map(move |&b| (a, d, b)))
        })
    }

    pub fn n_relations(&self) -> usize {
        self.out
            .iter()
            .map(|slots| slots[0].len() + slots[1].len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Direction::{Downstream, Upstream};

    fn skipped_exon_triples() -> Vec<Triple> {
        vec![
            Triple::new("j1", "e1", Upstream),
            Triple::new("j1", "e2", Downstream),
            Triple::new("j2", "e2", Upstream),
            Triple::new("j2", "e3", Downstream),
            Triple::new("j3", "e1", Upstream),
            Triple::new("j3", "e3", Downstream),
        ]
    }

    fn build(triples: &[Triple]) -> (ItemIndex, RelationGraph) {
        let items = ItemIndex::from_items(
            triples
                .iter()
                .map(|t| t.exon.as_str())
                .chain(triples.iter().map(|t| t.junction.as_str())),
        );
        let graph = RelationGraph::build(&items, triples).unwrap();
        (items, graph)
    }

    #[test]
    fn item_index_is_a_bijection() {
        let items = ItemIndex::from_items(["e1", "e2", "e1", "j1"]);
        assert_eq!(items.len(), 3);
        for (i, name) in items.names().iter().enumerate() {
            assert_eq!(items.get(name), Some(i));
            assert_eq!(items.name(i), name);
        }
        assert!(matches!(items.resolve("nope"), Err(Error::UnknownItem(_))));
    }

    #[test]
    fn every_relation_has_its_mirror() {
        let (_, graph) = build(&skipped_exon_triples());

        assert_eq!(graph.n_relations(), 12);
        for (a, d, b) in graph.relations() {
            assert!(graph.has_relation(b, d.opposite(), a), "{a} {d} {b} has no mirror");
        }
    }

    #[test]
    fn sources_and_targets_agree() {
        let (items, graph) = build(&skipped_exon_triples());
        let e1 = items.get("e1").unwrap();
        let j1 = items.get("j1").unwrap();
        let j3 = items.get("j3").unwrap();

        assert_eq!(graph.targets(e1, Upstream), &ItemSet::from([j1, j3]));
        assert_eq!(graph.sources(Downstream, e1), graph.targets(e1, Upstream));
        assert!(graph.targets(e1, Downstream).is_empty());
    }

    #[test]
    fn two_hops_reach_the_neighbouring_exons() {
        let (items, graph) = build(&skipped_exon_triples());
        let id = |n: &str| items.get(n).unwrap();

        let reached = graph.walk(id("e1"), &[Upstream, Upstream]);
        assert_eq!(reached, ItemSet::from([id("e2"), id("e3")]));

        let j23 = graph.common(id("e2"), Upstream, id("e3"), Downstream);
        assert_eq!(j23, ItemSet::from([id("j2")]));
    }

    #[test]
    fn unknown_items_fail_the_build() {
        let items = ItemIndex::from_items(["e1", "j1"]);
        let triples = vec![Triple::new("j1", "e2", Upstream)];
        let err = RelationGraph::build(&items, &triples).unwrap_err();
        assert!(matches!(err, Error::UnknownItem(name) if name == "e2"));
    }
}
