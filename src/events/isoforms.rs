use log::info;

use crate::events::EventTable;
use crate::index::AnnotationIndex;

/// Fill the isoform transcript columns of every row.
///
/// A transcript belongs to an isoform when it contains every exon of that
/// isoform and none of the exons specific to the other one. Exons missing
/// from the annotation leave the isoform empty.
pub fn annotate_isoforms(table: &mut EventTable, index: &AnnotationIndex) {
    let (iso1, iso2) = table.kind.isoform_exons();
    let (skip1, skip2) = table.kind.isoform_excluded_exons();
    let mut n_annotated = 0usize;

    for row in table.rows_mut() {
        let pick = |positions: &[usize]| -> Vec<&str> {
            positions
                .iter()
                .filter_map(|&i| row.exons.get(i).map(|s| s.as_str()))
                .collect()
        };
        let iso1_tx = index.transcripts_with_without(&pick(iso1), &pick(skip1));
        let iso2_tx = index.transcripts_with_without(&pick(iso2), &pick(skip2));

        row.isoform1_transcripts = iso1_tx;
        row.isoform2_transcripts = iso2_tx;

        if !row.isoform1_transcripts.is_empty() || !row.isoform2_transcripts.is_empty() {
            n_annotated += 1;
        }
    }

    table.mark_annotated();
    info!(
        "{} of {} {} events have annotated transcripts",
        n_annotated,
        table.len(),
        table.kind
    );
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::events::{EventKind, EventRow};
    use crate::index::AnnotationKeys;

    const GTF: &str = "\
chr1\tsrc\texon\t100\t200\t.\t+\t.\tgene_id \"G\"; transcript_id \"T1\";
chr1\tsrc\texon\t300\t400\t.\t+\t.\tgene_id \"G\"; transcript_id \"T1\";
chr1\tsrc\texon\t500\t600\t.\t+\t.\tgene_id \"G\"; transcript_id \"T1\";
chr1\tsrc\texon\t100\t200\t.\t+\t.\tgene_id \"G\"; transcript_id \"T2\";
chr1\tsrc\texon\t500\t600\t.\t+\t.\tgene_id \"G\"; transcript_id \"T2\";
";

    #[test]
    fn skipped_exon_isoforms_split_inclusion_and_exclusion() {
        let index = AnnotationIndex::new()
            .from_reader(Cursor::new(GTF), AnnotationKeys::default())
            .unwrap();
        let row = EventRow::new(
            vec![
                "exon:chr1:100-200:+".into(),
                "exon:chr1:300-400:+".into(),
                "exon:chr1:500-600:+".into(),
            ],
            vec![vec![], vec![], vec![]],
        );
        let mut table = EventTable::new(EventKind::SkippedExon, vec![row]);

        annotate_isoforms(&mut table, &index);

        assert!(table.is_annotated());
        let row = &table.rows()[0];
        // T1 carries exon2 as well, so only T2 skips it
        assert_eq!(row.isoform1_transcripts, vec!["T2"]);
        assert_eq!(row.isoform2_transcripts, vec!["T1"]);
    }

    #[test]
    fn unknown_exons_leave_isoforms_empty() {
        let index = AnnotationIndex::new()
            .from_reader(Cursor::new(GTF), AnnotationKeys::default())
            .unwrap();
        let row = EventRow::new(
            vec![
                "exon:chr1:100-200:+".into(),
                "exon:chr1:300-400:+".into(),
                "exon:chr1:700-800:+".into(),
            ],
            vec![vec![], vec![], vec![]],
        );
        let mut table = EventTable::new(EventKind::SkippedExon, vec![row]);

        annotate_isoforms(&mut table, &index);

        let row = &table.rows()[0];
        assert!(row.isoform1_transcripts.is_empty());
        assert!(row.isoform2_transcripts.is_empty());
    }

    #[test]
    fn mutually_exclusive_isoforms_exclude_the_other_exon() {
        // A uses exon2, B uses exon3, BOTH carries the two of them
        let gtf = "\
chr2\tsrc\texon\t100\t200\t.\t+\t.\ttranscript_id \"A\";
chr2\tsrc\texon\t300\t400\t.\t+\t.\ttranscript_id \"A\";
chr2\tsrc\texon\t700\t800\t.\t+\t.\ttranscript_id \"A\";
chr2\tsrc\texon\t100\t200\t.\t+\t.\ttranscript_id \"B\";
chr2\tsrc\texon\t500\t600\t.\t+\t.\ttranscript_id \"B\";
chr2\tsrc\texon\t700\t800\t.\t+\t.\ttranscript_id \"B\";
chr2\tsrc\texon\t100\t200\t.\t+\t.\ttranscript_id \"BOTH\";
chr2\tsrc\texon\t300\t400\t.\t+\t.\ttranscript_id \"BOTH\";
chr2\tsrc\texon\t500\t600\t.\t+\t.\ttranscript_id \"BOTH\";
chr2\tsrc\texon\t700\t800\t.\t+\t.\ttranscript_id \"BOTH\";
";
        let index = AnnotationIndex::new()
            .from_reader(Cursor::new(gtf), AnnotationKeys::default())
            .unwrap();
        let row = EventRow::new(
            vec![
                "exon:chr2:100-200:+".into(),
                "exon:chr2:300-400:+".into(),
                "exon:chr2:500-600:+".into(),
                "exon:chr2:700-800:+".into(),
            ],
            vec![vec![], vec![], vec![], vec![]],
        );
        let mut table = EventTable::new(EventKind::MutuallyExclusiveExon, vec![row]);

        annotate_isoforms(&mut table, &index);

        let row = &table.rows()[0];
        assert_eq!(row.isoform1_transcripts, vec!["B"]);
        assert_eq!(row.isoform2_transcripts, vec!["A"]);
    }

    #[test]
    fn inclusion_only_transcript_does_not_support_skipping() {
        let gtf = "\
chr1\tsrc\texon\t100\t200\t.\t+\t.\ttranscript_id \"INC\";
chr1\tsrc\texon\t300\t400\t.\t+\t.\ttranscript_id \"INC\";
chr1\tsrc\texon\t500\t600\t.\t+\t.\ttranscript_id \"INC\";
";
        let index = AnnotationIndex::new()
            .from_reader(Cursor::new(gtf), AnnotationKeys::default())
            .unwrap();
        let row = EventRow::new(
            vec![
                "exon:chr1:100-200:+".into(),
                "exon:chr1:300-400:+".into(),
                "exon:chr1:500-600:+".into(),
            ],
            vec![vec![], vec![], vec![]],
        );
        let mut table = EventTable::new(EventKind::SkippedExon, vec![row]);

        annotate_isoforms(&mut table, &index);

        let row = &table.rows()[0];
        assert!(row.isoform1_transcripts.is_empty());
        assert_eq!(row.isoform2_transcripts, vec!["INC"]);
    }
}
