//! Pick one canonical event out of a group of duplicates.
//!
//! The same isoform-defining junctions are often found through several exon
//! representatives. The consolidator ranks those rows by the annotation tags
//! of the transcripts that support them and keeps one.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Error, Result};
use crate::events::{EventRow, EventTable};
use crate::model::transcript::Transcript;

/// Tag prefixes in order of preference.
pub const BEST_TAGS: [&str; 4] = ["appris_principal", "appris_candidate", "CCDS", "basic"];

/// Anything that can resolve a transcript id to its annotation.
pub trait TranscriptLookup {
    fn transcript(&self, id: &str) -> Option<&Transcript>;
}

impl TranscriptLookup for HashMap<String, Transcript> {
    fn transcript(&self, id: &str) -> Option<&Transcript> {
        self.get(id)
    }
}

/// Why a row was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    OnlyOne,
    RandomNoAnnotatedTranscripts,
    OneAnnotated,
    RandomNoTags,
    BestTag(String),
    RandomNoGoodTags,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::OnlyOne => f.write_str("only one"),
            Reason::RandomNoAnnotatedTranscripts => f.write_str("random, no annotated transcripts"),
            Reason::OneAnnotated => f.write_str("one event with annotated transcripts"),
            Reason::RandomNoTags => f.write_str("random, no tags"),
            Reason::BestTag(tag) => write!(f, "best,{}", tag),
            Reason::RandomNoGoodTags => f.write_str("random, no good tags"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConsolidateOptions {
    /// Tag prefixes, best first.
    pub best_tags: Vec<String>,
    pub seed: u64,
}

impl Default for ConsolidateOptions {
    fn default() -> Self {
        Self {
            best_tags: BEST_TAGS.iter().map(|t| t.to_string()).collect(),
            seed: 0,
        }
    }
}

/// One consolidated event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidatedEvent {
    pub event_id: String,
    pub reason: Reason,
}

pub struct Consolidator<'a, L: TranscriptLookup + ?Sized> {
    lookup: &'a L,
    best_tags: Vec<String>,
    rng: StdRng,
}

impl<'a, L: TranscriptLookup + ?Sized> Consolidator<'a, L> {
    pub fn new(lookup: &'a L, options: &ConsolidateOptions) -> Self {
        Self {
            lookup,
            best_tags: options.best_tags.clone(),
            rng: StdRng::seed_from_u64(options.seed),
        }
    }

    /// Choose one row of `group` and say why.
    ///
    /// Only an empty group is an error; every other group falls through to a
    /// random pick at worst.
    pub fn consolidate(&mut self, group: &[EventRow]) -> Result<(Reason, String)> {
        match group {
            [] => return Err(Error::EmptyGroup),
            [only] => return Ok((Reason::OnlyOne, only.event_id.clone())),
            _ => {}
        }
        let lookup = self.lookup;

        // transcripts of each row that the annotation knows about
        let annotated: Vec<(&EventRow, Vec<&Transcript>)> = group
            .iter()
            .filter_map(|row| {
                let txs: Vec<&Transcript> = row
                    .transcript_ids()
                    .filter_map(|id| lookup.transcript(id))
                    .collect();
                (!txs.is_empty()).then_some((row, txs))
            })
            .collect();

        match annotated.len() {
            0 => {
                let id = pick(&mut self.rng, group.iter())?;
                return Ok((Reason::RandomNoAnnotatedTranscripts, id));
            }
            1 => return Ok((Reason::OneAnnotated, annotated[0].0.event_id.clone())),
            _ => {}
        }

        let tagged: Vec<(&EventRow, BTreeSet<&str>)> = annotated
            .iter()
            .map(|(row, txs)| {
                let tags: BTreeSet<&str> = txs
                    .iter()
                    .flat_map(|tx| tx.tags().iter().map(|t| t.as_str()))
                    .collect();
                (*row, tags)
            })
            .filter(|(_, tags)| !tags.is_empty())
            .collect();

        if tagged.is_empty() {
            let id = pick(&mut self.rng, annotated.iter().map(|(row, _)| *row))?;
            return Ok((Reason::RandomNoTags, id));
        }

        for best in &self.best_tags {
            let matching: Vec<&EventRow> = tagged
                .iter()
                .filter(|(_, tags)| tags.iter().any(|t| t.starts_with(best.as_str())))
                .map(|(row, _)| *row)
                .collect();
            if !matching.is_empty() {
                debug!("{} of {} rows carry {}", matching.len(), group.len(), best);
                let reason = Reason::BestTag(best.clone());
                let id = pick(&mut self.rng, matching.into_iter())?;
                return Ok((reason, id));
            }
        }

        let id = pick(&mut self.rng, group.iter())?;
        Ok((Reason::RandomNoGoodTags, id))
    }
}

/// Uniform choice among `rows`.
fn pick<'r>(rng: &mut StdRng, rows: impl Iterator<Item = &'r EventRow>) -> Result<String> {
    let rows: Vec<&EventRow> = rows.collect();
    rows.choose(rng)
        .map(|row| row.event_id.clone())
        .ok_or(Error::EmptyGroup)
}

/// Group rows sharing the same junction columns, in junction order.
pub fn group_duplicates(table: EventTable) -> Vec<Vec<EventRow>> {
    let mut groups: BTreeMap<Vec<Vec<String>>, Vec<EventRow>> = BTreeMap::new();
    for row in table.into_rows() {
        groups.entry(row.junctions.clone()).or_default().push(row);
    }
    groups.into_values().collect()
}

/// Consolidate every duplicate group of `table`.
pub fn consolidate_table<L: TranscriptLookup + ?Sized>(
    table: EventTable,
    lookup: &L,
    options: &ConsolidateOptions,
) -> Result<Vec<ConsolidatedEvent>> {
    let kind = table.kind;
    let n_rows = table.len();
    let groups = group_duplicates(table);

    let mut consolidator = Consolidator::new(lookup, options);
    let mut out = Vec::with_capacity(groups.len());
    for group in &groups {
        let (reason, event_id) = consolidator.consolidate(group)?;
        out.push(ConsolidatedEvent { event_id, reason });
    }

    info!("Consolidated {} {} events into {}", n_rows, kind, out.len());
    Ok(out)
}

/// Write `event_id\treason` rows with a header.
pub fn write_consolidated<W: Write>(events: &[ConsolidatedEvent], mut w: W) -> std::io::Result<()> {
    writeln!(w, "event_id\treason")?;
    for ev in events {
        writeln!(w, "{}\t{}", ev.event_id, ev.reason)?;
    }
    w.flush()
}

pub fn save_consolidated(events: &[ConsolidatedEvent], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let f = File::create(path).map_err(|e| Error::io(e, path))?;
    write_consolidated(events, BufWriter::new(f)).map_err(|e| Error::io(e, path))
}
