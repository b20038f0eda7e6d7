use serde::{Serialize, Deserialize};

use crate::model::types::{ExonId, TranscriptId};
use crate::types::Strand;

/// Transcript feature as seen by the consolidator: stable id, tags, and member exons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub idx: TranscriptId,
    pub id: String,
    pub gene_id: Option<String>,
    pub chrom: String,
    pub strand: Strand,
    tags: Vec<String>,
    exons: Vec<ExonId>,
}

impl Transcript {
    pub fn new(
        idx: TranscriptId,
        id: impl Into<String>,
        gene_id: Option<String>,
        chrom: impl Into<String>,
        strand: Strand,
    ) -> Self {
        Self {
            idx,
            id: id.into(),
            gene_id,
            chrom: chrom.into(),
            strand,
            tags: Vec::new(),
            exons: Vec::new(),
        }
    }

    /// Add an annotation tag (deduped, order of first appearance kept).
    pub fn add_tag(&mut self, tag: &str) {
        let tag = tag.trim();
        if tag.is_empty() {
            return;
        }
        if !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.to_string());
        }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// True if any tag starts with `prefix` (`appris_principal` matches `appris_principal_1`).
    pub fn has_tag_prefix(&self, prefix: &str) -> bool {
        self.tags.iter().any(|t| t.starts_with(prefix))
    }

    pub fn add_exon(&mut self, exon: ExonId) {
        self.exons.push(exon);
    }

    pub fn exons(&self) -> &[ExonId] {
        &self.exons
    }

    pub fn contains_exon(&self, exon: ExonId) -> bool {
        self.exons.binary_search(&exon).is_ok()
    }

    /// Sort exon ids and remove duplicates; required before `contains_exon`.
    pub fn finalize(&mut self) {
        self.exons.sort_unstable();
        self.exons.dedup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_deduped_and_prefix_matched() {
        let mut t = Transcript::new(0, "T1", Some("G1".into()), "chr1", Strand::Plus);
        t.add_tag("basic");
        t.add_tag("basic");
        t.add_tag(" appris_principal_1 ");
        t.add_tag("");

        assert_eq!(t.tags(), ["basic", "appris_principal_1"]);
        assert!(t.has_tag_prefix("appris_principal"));
        assert!(!t.has_tag_prefix("CCDS"));
    }

    #[test]
    fn finalize_sorts_and_dedups_exons() {
        let mut t = Transcript::new(3, "T3", None, "chr2", Strand::Minus);
        t.add_exon(7);
        t.add_exon(2);
        t.add_exon(7);
        t.finalize();

        assert_eq!(t.exons(), &[2, 7]);
        assert!(t.contains_exon(7));
        assert!(!t.contains_exon(5));
    }
}
