use log::{trace, warn};

use crate::events::{pairs, CandidateEvents, EventKind, EventTable, JunctionAggregator};
use crate::graph::{ItemId, ItemSet};
use crate::types::Direction::{Downstream, Upstream};

impl JunctionAggregator {
    /// Mutually-exclusive-exon events: exon2 and exon3 are alternatives, each
    /// joined to the same exon1 upstream and exon4 downstream.
    ///
    /// Columns: `exon1..exon4, junction13, junction34, junction12, junction24, event_id`.
    pub fn mutually_exclusive_exon(&self) -> EventTable {
        let events = self.collect_events(EventKind::MutuallyExclusiveExon, |exon1, acc| {
            self.check_exon_in_mxe_event(exon1, acc)
        });
        self.to_table(EventKind::MutuallyExclusiveExon, events)
    }

    /// Record every mutually-exclusive-exon event that starts at `exon1`.
    pub(crate) fn check_exon_in_mxe_event(&self, exon1: ItemId, events: &mut CandidateEvents) {
        let g = self.graph();

        let exon23s_from1 = g.walk(exon1, &[Upstream, Upstream]);
        if exon23s_from1.len() < 2 {
            return;
        }

        let exon4s = g.hop(&g.hop(&exon23s_from1, Upstream), Upstream);
        let exon23s_from4 = g.hop(&g.hop(&exon4s, Downstream), Downstream);

        let mut exon23s: ItemSet = exon23s_from1.intersection(&exon23s_from4).copied().collect();
        exon23s.remove(&exon1);

        for (a, b) in pairs(&exon23s) {
            let Some((exon2, exon3)) = self.ordered_pair(a, b) else {
                continue;
            };

            let Some(exon4) = self.common_exon4(exon2, exon3) else {
                trace!(
                    "{} and {} share no downstream exon",
                    self.name(exon2),
                    self.name(exon3)
                );
                continue;
            };

            let exons = vec![exon1, exon2, exon3, exon4];
            if !self.is_ordered_chain(&exons) {
                trace!("{:?} is not an ordered exon chain", exons);
                continue;
            }

            // isoform 1 (inclusion of exon3)
            let junction13 = g.common(exon1, Upstream, exon3, Downstream);
            let junction34 = g.common(exon3, Upstream, exon4, Downstream);

            // isoform 2 (inclusion of exon2)
            let junction12 = g.common(exon1, Upstream, exon2, Downstream);
            let junction24 = g.common(exon2, Upstream, exon4, Downstream);

            events.insert(exons, vec![junction13, junction34, junction12, junction24]);
        }
    }

    /// The exon two hops downstream of both exon2 and exon3.
    ///
    /// Several candidates are ambiguous: the smallest item id wins and a warning is logged.
    fn common_exon4(&self, exon2: ItemId, exon3: ItemId) -> Option<ItemId> {
        let g = self.graph();
        let from2 = g.walk(exon2, &[Upstream, Upstream]);
        let from3 = g.walk(exon3, &[Upstream, Upstream]);
        let common: ItemSet = from2.intersection(&from3).copied().collect();

        let first = common.first().copied()?;
        if common.len() > 1 {
            let names: Vec<&str> = common.iter().map(|&e| self.name(e)).collect();
            warn!(
                "{} and {} share {} downstream exons {:?}; using {}",
                self.name(exon2),
                self.name(exon3),
                common.len(),
                names,
                self.name(first)
            );
        }
        Some(first)
    }
}

#[cfg(test)]
mod tests {
    use crate::events::JunctionAggregator;
    use crate::graph::Triple;
    use crate::types::Direction::{Downstream, Upstream};

    const E1: &str = "exon:chr1:100-200:+";
    const E2: &str = "exon:chr1:300-400:+";
    const E3: &str = "exon:chr1:500-600:+";
    const E4: &str = "exon:chr1:700-800:+";

    const J12: &str = "chr1:201-299:+";
    const J13: &str = "chr1:201-499:+";
    const J24: &str = "chr1:401-699:+";
    const J34: &str = "chr1:601-699:+";

    fn link(junction: &str, up: &str, down: &str) -> [Triple; 2] {
        [
            Triple::new(junction, up, Upstream),
            Triple::new(junction, down, Downstream),
        ]
    }

    fn mxe_triples() -> Vec<Triple> {
        let mut t = Vec::new();
        t.extend(link(J12, E1, E2));
        t.extend(link(J13, E1, E3));
        t.extend(link(J24, E2, E4));
        t.extend(link(J34, E3, E4));
        t
    }

    #[test]
    fn finds_the_mutually_exclusive_pair() {
        let agg = JunctionAggregator::new(&mxe_triples()).unwrap();
        let table = agg.mutually_exclusive_exon();

        assert_eq!(table.len(), 1);
        let row = &table.rows()[0];
        assert_eq!(row.exons, vec![E1, E2, E3, E4]);
        assert_eq!(row.junction_ids(), vec![J13, J34, J12, J24]);
        assert_eq!(row.event_id, format!("{E1}@{E2}@{E3}@{E4}"));
    }

    #[test]
    fn mxe_topology_is_not_a_skipped_exon() {
        let agg = JunctionAggregator::new(&mxe_triples()).unwrap();
        assert!(agg.skipped_exon().is_empty());
    }

    #[test]
    fn skipped_exon_topology_is_not_mxe() {
        let mut t = Vec::new();
        t.extend(link(J12, E1, E2));
        t.extend(link("chr1:401-499:+", E2, E3));
        t.extend(link(J13, E1, E3));
        let agg = JunctionAggregator::new(&t).unwrap();
        assert!(agg.mutually_exclusive_exon().is_empty());
    }

    #[test]
    fn different_downstream_exons_are_rejected() {
        let e4b = "exon:chr1:900-950:+";
        let mut t = Vec::new();
        t.extend(link(J12, E1, E2));
        t.extend(link(J13, E1, E3));
        t.extend(link(J24, E2, E4));
        t.extend(link("chr1:601-899:+", E3, e4b));
        let agg = JunctionAggregator::new(&t).unwrap();
        assert!(agg.mutually_exclusive_exon().is_empty());
    }

    #[test]
    fn ambiguous_exon4_takes_the_lowest_index() {
        // two non-overlapping exon4 candidates reachable from both exon2 and exon3
        let e5 = "exon:chr1:900-950:+";
        let mut t = mxe_triples();
        t.extend(link("chr1:401-899:+", E2, e5));
        t.extend(link("chr1:601-899:+", E3, e5));
        let agg = JunctionAggregator::new(&t).unwrap();
        let table = agg.mutually_exclusive_exon();

        // E4 was seen before e5, so it has the lower index
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].exons[3], E4);

        // and the choice does not change between runs
        assert_eq!(agg.mutually_exclusive_exon(), table);
    }
}
