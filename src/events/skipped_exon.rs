use log::trace;

use crate::events::{pairs, CandidateEvents, EventKind, EventTable, JunctionAggregator};
use crate::graph::ItemId;
use crate::types::Direction::{Downstream, Upstream};

impl JunctionAggregator {
    /// Skipped-exon events: `exon1 -> exon2 -> exon3` with a junction from
    /// exon1 straight to exon3.
    ///
    /// Columns: `exon1, exon2, exon3, junction12, junction23, junction13, event_id`.
    pub fn skipped_exon(&self) -> EventTable {
        let events = self.collect_events(EventKind::SkippedExon, |exon1, acc| {
            self.check_exon_in_se_event(exon1, acc)
        });
        self.to_table(EventKind::SkippedExon, events)
    }

    /// Record every skipped-exon event that starts at `exon1`.
    pub(crate) fn check_exon_in_se_event(&self, exon1: ItemId, events: &mut CandidateEvents) {
        let g = self.graph();

        let mut exon23s = g.walk(exon1, &[Upstream, Upstream]);
        exon23s.remove(&exon1);

        for (a, b) in pairs(&exon23s) {
            let Some((exon2, exon3)) = self.ordered_pair(a, b) else {
                continue;
            };

            // exon2 has to connect straight to exon3
            let junction23 = g.common(exon2, Upstream, exon3, Downstream);
            if junction23.is_empty() {
                trace!("no junction between {} and {}", self.name(exon2), self.name(exon3));
                continue;
            }

            let exons = vec![exon1, exon2, exon3];
            if !self.is_ordered_chain(&exons) {
                trace!("{} is not upstream of {}", self.name(exon1), self.name(exon2));
                continue;
            }

            // isoform 2 (inclusion of exon2)
            let junction12 = g.common(exon1, Upstream, exon2, Downstream);
            // isoform 1 (exclusion of exon2)
            let junction13 = g.common(exon1, Upstream, exon3, Downstream);

            events.insert(exons, vec![junction12, junction23, junction13]);
        }
    }
}
