//! Junction tables and the triples that tie junctions to their flanking exons.
//!
//! Junction ids are regions whose coordinates are the intron, 1-based
//! inclusive: the upstream exon ends at `start - 1` and the downstream exon
//! starts at `stop + 1`.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use log::{debug, info};

use crate::error::{Error, Result};
use crate::graph::Triple;
use crate::index::AnnotationIndex;
use crate::types::{Direction, Region};

const PROGRESS_EVERY: usize = 10_000;

/// Exons on either side of one junction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JunctionExons {
    pub junction: String,
    pub upstream: Vec<String>,
    pub downstream: Vec<String>,
}

/// Open a table, decompressing `.gz` files.
pub fn open_table(path: impl AsRef<Path>) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|e| Error::io(e, path))?;
    let is_gz = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);

    Ok(if is_gz {
        Box::new(BufReader::new(GzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    })
}

/// Data lines of a table as `(line_no, fields)`; comments, blank lines and a
/// header (the first other line, if it starts with `header`) are skipped.
fn data_lines<R: BufRead>(
    reader: R,
    header: &'static str,
) -> impl Iterator<Item = Result<(usize, Vec<String>)>> {
    let mut seen_data = false;
    reader
        .lines()
        .enumerate()
        .filter_map(move |(i, line)| {
            let line = match line {
                Ok(l) => l,
                Err(e) => return Some(Err(Error::from(e))),
            };
            if line.trim().is_empty() || line.starts_with('#') {
                return None;
            }
            let fields: Vec<String> = line.split('\t').map(|f| f.trim().to_string()).collect();
            let first = !seen_data;
            seen_data = true;
            if first && fields[0] == header {
                return None;
            }
            Some(Ok((i + 1, fields)))
        })
}

/// One junction id per line (first tab-separated column).
pub fn read_junction_ids<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for line in data_lines(reader, "junction") {
        let (_, fields) = line?;
        out.push(fields[0].clone());
    }
    Ok(out)
}

/// Find the annotated exons flanking every junction.
///
/// Every junction id must parse as a region. Junctions without any adjacent
/// exon produce no triples.
pub fn adjacent_triples(junctions: &[String], index: &AnnotationIndex) -> Result<Vec<Triple>> {
    let mut triples = Vec::new();
    let mut n_orphans = 0usize;

    info!("Finding exons adjacent to {} junctions...", junctions.len());
    for (i, junction) in junctions.iter().enumerate() {
        let region: Region = junction.parse()?;

        let upstream = match region.start.checked_sub(1) {
            Some(pos) => index.exons_ending_at(&region.chrom, region.strand, pos),
            None => Vec::new(),
        };
        let downstream = match region.stop.checked_add(1) {
            Some(pos) => index.exons_starting_at(&region.chrom, region.strand, pos),
            None => Vec::new(),
        };

        if upstream.is_empty() && downstream.is_empty() {
            debug!("{} has no annotated exon on either side", junction);
            n_orphans += 1;
        }

        triples.extend(
            upstream
                .iter()
                .map(|e| Triple::new(junction.as_str(), e.id.as_str(), Direction::Upstream)),
        );
        triples.extend(
            downstream
                .iter()
                .map(|e| Triple::new(junction.as_str(), e.id.as_str(), Direction::Downstream)),
        );

        if (i + 1) % PROGRESS_EVERY == 0 {
            info!("\t{}/{} junctions done", i + 1, junctions.len());
        }
    }

    info!(
        "{} triples from {} junctions ({} without adjacent exons)",
        triples.len(),
        junctions.len(),
        n_orphans
    );
    Ok(triples)
}

/// Expand per-junction exon lists into triples.
pub fn triples_from_exon_lists(rows: &[JunctionExons]) -> Vec<Triple> {
    let mut triples = Vec::new();
    for row in rows {
        for exon in &row.upstream {
            triples.push(Triple::new(row.junction.as_str(), exon.as_str(), Direction::Upstream));
        }
        for exon in &row.downstream {
            triples.push(Triple::new(row.junction.as_str(), exon.as_str(), Direction::Downstream));
        }
    }
    triples
}

/// Read `junction\tupstream\tdownstream` rows; the exon columns are comma lists
/// and may be empty.
pub fn read_junction_exons<R: BufRead>(reader: R) -> Result<Vec<JunctionExons>> {
    let split = |cell: Option<&String>| -> Vec<String> {
        cell.map(|c| {
            c.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
    };

    let mut out = Vec::new();
    for line in data_lines(reader, "junction") {
        let (line_no, fields) = line?;
        if fields.len() > 3 {
            return Err(Error::MalformedTable {
                line_no,
                problem: format!("expected at most 3 columns, found {}", fields.len()),
            });
        }
        out.push(JunctionExons {
            junction: fields[0].clone(),
            upstream: split(fields.get(1)),
            downstream: split(fields.get(2)),
        });
    }
    Ok(out)
}

/// Read a `junction\texon\tdirection` table.
pub fn read_triples<R: BufRead>(reader: R) -> Result<Vec<Triple>> {
    let mut out = Vec::new();
    for line in data_lines(reader, "junction") {
        let (line_no, fields) = line?;
        let [junction, exon, direction] = fields.as_slice() else {
            return Err(Error::MalformedTable {
                line_no,
                problem: format!("expected 3 columns, found {}", fields.len()),
            });
        };
        let direction: Direction = direction.parse().map_err(|e: Error| Error::MalformedTable {
            line_no,
            problem: e.to_string(),
        })?;
        out.push(Triple::new(junction.as_str(), exon.as_str(), direction));
    }
    Ok(out)
}

pub fn write_triples<W: Write>(triples: &[Triple], mut w: W) -> std::io::Result<()> {
    writeln!(w, "junction\texon\tdirection")?;
    for t in triples {
        writeln!(w, "{}\t{}\t{}", t.junction, t.exon, t.direction)?;
    }
    w.flush()
}

pub fn load_triples(path: impl AsRef<Path>) -> Result<Vec<Triple>> {
    read_triples(open_table(path)?)
}

pub fn save_triples(triples: &[Triple], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let f = File::create(path).map_err(|e| Error::io(e, path))?;
    write_triples(triples, BufWriter::new(f)).map_err(|e| Error::io(e, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::AnnotationKeys;
    use std::io::Cursor;

    const GTF: &str = "\
chr1\tsrc\texon\t100\t200\t.\t+\t.\tgene_id \"G\"; transcript_id \"T1\";
chr1\tsrc\texon\t300\t400\t.\t+\t.\tgene_id \"G\"; transcript_id \"T1\";
chr1\tsrc\texon\t300\t400\t.\t-\t.\tgene_id \"H\"; transcript_id \"T9\";
";

    #[test]
    fn junction_table_skips_comments_and_header() {
        let text = "junction\tcount\n# comment\nchr1:201-299:+\t12\n\nchr1:401-499:+\n";
        let ids = read_junction_ids(Cursor::new(text)).unwrap();
        assert_eq!(ids, vec!["chr1:201-299:+", "chr1:401-499:+"]);
    }

    #[test]
    fn header_after_leading_comments_is_skipped() {
        let text = "# made by the aligner\n\njunction\nchr1:201-299:+\n";
        let ids = read_junction_ids(Cursor::new(text)).unwrap();
        assert_eq!(ids, vec!["chr1:201-299:+"]);

        let text = "# c\njunction\texon\tdirection\nj1\te1\tupstream\n";
        let triples = read_triples(Cursor::new(text)).unwrap();
        assert_eq!(triples, vec![Triple::new("j1", "e1", Direction::Upstream)]);
    }

    #[test]
    fn only_the_first_data_line_can_be_a_header() {
        let text = "chr1:201-299:+\njunction\n";
        let ids = read_junction_ids(Cursor::new(text)).unwrap();
        assert_eq!(ids, vec!["chr1:201-299:+", "junction"]);
    }

    #[test]
    fn flanking_exons_follow_intron_coordinates() {
        let index = AnnotationIndex::new()
            .from_reader(Cursor::new(GTF), AnnotationKeys::default())
            .unwrap();
        let junctions = vec!["chr1:201-299:+".to_string(), "chr1:5000-6000:+".to_string()];

        let triples = adjacent_triples(&junctions, &index).unwrap();
        assert_eq!(
            triples,
            vec![
                Triple::new("chr1:201-299:+", "exon:chr1:100-200:+", Direction::Upstream),
                Triple::new("chr1:201-299:+", "exon:chr1:300-400:+", Direction::Downstream),
            ]
        );
    }

    #[test]
    fn bad_junction_ids_are_fatal() {
        let index = AnnotationIndex::new();
        let err = adjacent_triples(&["nonsense".to_string()], &index).unwrap_err();
        assert!(matches!(err, Error::InvalidRegion { .. }));
    }

    #[test]
    fn exon_lists_expand_to_triples() {
        let text = "junction\tupstream\tdownstream\nj1\te1,e2\te3\nj2\t\te4\n";
        let rows = read_junction_exons(Cursor::new(text)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].upstream, vec!["e1", "e2"]);
        assert!(rows[1].upstream.is_empty());

        let triples = triples_from_exon_lists(&rows);
        assert_eq!(triples.len(), 4);
        assert_eq!(triples[1], Triple::new("j1", "e2", Direction::Upstream));
        assert_eq!(triples[3], Triple::new("j2", "e4", Direction::Downstream));
    }

    #[test]
    fn triple_table_reads_back() {
        let triples = vec![
            Triple::new("j1", "e1", Direction::Upstream),
            Triple::new("j1", "e2", Direction::Downstream),
        ];
        let mut out = Vec::new();
        write_triples(&triples, &mut out).unwrap();
        assert_eq!(read_triples(Cursor::new(out)).unwrap(), triples);
    }

    #[test]
    fn malformed_triple_lines_name_the_line() {
        let text = "junction\texon\tdirection\nj1\te1\tupstream\nj1\te2\tsideways\n";
        let err = read_triples(Cursor::new(text)).unwrap_err();
        assert!(matches!(err, Error::MalformedTable { line_no: 3, .. }));

        let err = read_triples(Cursor::new("j1\te1\n")).unwrap_err();
        assert!(matches!(err, Error::MalformedTable { line_no: 1, .. }));
    }

    #[test]
    fn triples_save_and_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triples.tsv");
        let triples = vec![Triple::new("j1", "e1", Direction::Upstream)];

        save_triples(&triples, &path).unwrap();
        assert_eq!(load_triples(&path).unwrap(), triples);
    }
}
