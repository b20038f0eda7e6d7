use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::events::EventKind;

/// Separator between exon ids in an `event_id`.
pub const EVENT_ID_SEP: &str = "@";

/// Separator between several ids sharing one cell.
const CELL_SEP: &str = ",";

pub const ISOFORM_COLUMNS: [&str; 2] = ["isoform1_transcripts", "isoform2_transcripts"];

/// One detected event.
///
/// `junctions[i]` holds the junctions of the i-th junction column of the event
/// kind; normally exactly one each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    pub exons: Vec<String>,
    pub junctions: Vec<Vec<String>>,
    pub event_id: String,
    pub isoform1_transcripts: Vec<String>,
    pub isoform2_transcripts: Vec<String>,
}

impl EventRow {
    pub fn new(exons: Vec<String>, junctions: Vec<Vec<String>>) -> Self {
        let event_id = exons.join(EVENT_ID_SEP);
        Self {
            exons,
            junctions,
            event_id,
            isoform1_transcripts: Vec::new(),
            isoform2_transcripts: Vec::new(),
        }
    }

    /// All junction ids of the event, column by column.
    pub fn junction_ids(&self) -> Vec<&str> {
        self.junctions
            .iter()
            .flat_map(|col| col.iter().map(|s| s.as_str()))
            .collect()
    }

    /// Transcript ids of both isoforms.
    pub fn transcript_ids(&self) -> impl Iterator<Item = &str> {
        self.isoform1_transcripts
            .iter()
            .chain(self.isoform2_transcripts.iter())
            .map(|s| s.as_str())
    }
}

/// Output of one detector run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTable {
    pub kind: EventKind,
    rows: Vec<EventRow>,
    annotated: bool,
}

impl EventTable {
    pub fn new(kind: EventKind, rows: Vec<EventRow>) -> Self {
        Self {
            kind,
            rows,
            annotated: false,
        }
    }

    pub fn rows(&self) -> &[EventRow] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [EventRow] {
        &mut self.rows
    }

    pub fn into_rows(self) -> Vec<EventRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_annotated(&self) -> bool {
        self.annotated
    }

    pub(crate) fn mark_annotated(&mut self) {
        self.annotated = true;
    }

    pub fn row(&self, event_id: &str) -> Option<&EventRow> {
        self.rows.iter().find(|r| r.event_id == event_id)
    }

    /// Column names: exons, junctions, `event_id`, then isoform transcripts if annotated.
    pub fn header(&self) -> Vec<&'static str> {
        let mut cols: Vec<&'static str> = Vec::new();
        cols.extend_from_slice(self.kind.exon_columns());
        cols.extend_from_slice(self.kind.junction_columns());
        cols.push("event_id");
        if self.annotated {
            cols.extend_from_slice(&ISOFORM_COLUMNS);
        }
        cols
    }

    /// Write the table as TSV with a header line.
    pub fn write_tsv<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        writeln!(w, "{}", self.header().join("\t"))?;

        for row in &self.rows {
            let mut cells: Vec<String> = row.exons.clone();
            cells.extend(row.junctions.iter().map(|col| col.join(CELL_SEP)));
            cells.push(row.event_id.clone());
            if self.annotated {
                cells.push(row.isoform1_transcripts.join(CELL_SEP));
                cells.push(row.isoform2_transcripts.join(CELL_SEP));
            }
            writeln!(w, "{}", cells.join("\t"))?;
        }

        w.flush()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let f = File::create(path).map_err(|e| Error::io(e, path))?;
        self.write_tsv(BufWriter::new(f))
            .map_err(|e| Error::io(e, path))
    }
}
