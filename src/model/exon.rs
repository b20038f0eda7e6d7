use serde::{Serialize, Deserialize};

use crate::model::types::{ExonId, TranscriptId};
use crate::types::{stringify_location, Region, Strand};

/// Type tag put in front of exon locations to build exon item ids.
pub const EXON_TAG: &str = "exon";

/// Exon feature, deduplicated by location across transcripts.
///
/// Coordinates are 1-based inclusive, as written in the annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exon {
    pub idx: ExonId,
    /// Item id, e.g. `exon:chr1:100-200:+`.
    pub id: String,
    pub chrom: String,
    pub start: u32,
    pub stop: u32,
    pub strand: Strand,
    transcripts: Vec<TranscriptId>,
}

impl Exon {
    pub fn new(idx: ExonId, chrom: impl Into<String>, start: u32, stop: u32, strand: Strand) -> Self {
        let chrom = chrom.into();
        let id = stringify_location(&chrom, start, stop, strand, Some(EXON_TAG));
        Self {
            idx,
            id,
            chrom,
            start,
            stop,
            strand,
            transcripts: Vec::new(),
        }
    }

    pub fn add_transcript(&mut self, tx: TranscriptId) {
        self.transcripts.push(tx);
    }

    pub fn transcripts(&self) -> &[TranscriptId] {
        &self.transcripts
    }

    pub fn finalize(&mut self) {
        self.transcripts.sort_unstable();
        self.transcripts.dedup();
    }

    pub fn region(&self) -> Region {
        Region {
            name: self.id.clone(),
            chrom: self.chrom.clone(),
            start: self.start,
            stop: self.stop,
            strand: self.strand,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exon_id_is_a_tagged_location() {
        let mut e = Exon::new(0, "chr1", 100, 200, Strand::Plus);
        assert_eq!(e.id, "exon:chr1:100-200:+");

        let parsed: Region = e.id.parse().unwrap();
        assert_eq!(parsed, e.region());

        e.add_transcript(4);
        e.add_transcript(1);
        e.add_transcript(4);
        e.finalize();
        assert_eq!(e.transcripts(), &[1, 4]);
    }
}
