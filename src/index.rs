use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use anyhow::{bail, Context};
use flate2::read::GzDecoder;
use serde::{Serialize, Deserialize};

use crate::annotation::io::{AnnotationReader, AnnotationRecord, ParseError};
use crate::consolidate::TranscriptLookup;
use crate::model::exon::Exon;
use crate::model::transcript::Transcript;
use crate::model::types::{ExonId, TranscriptId};
use crate::types::Strand;

const MAGIC: &[u8; 4] = b"SEX1";
const VERSION_STR: &str = env!("CARGO_PKG_VERSION");

/// Configure which attribute keys are used to extract:
/// - transcript stable identifier of exon lines (GTF `transcript_id`)
/// - GFF3 exon -> transcript links (usually `Parent`, comma separated)
/// - transcript id of transcript lines in GFF3 (usually `ID`)
/// - gene identifier
/// - transcript annotation tags (multi-valued)
///
/// Multiple keys per category are allowed; first present wins.
#[derive(Debug, Clone)]
pub struct AnnotationKeys {
    pub transcript_id_keys: Vec<String>,
    pub parent_keys: Vec<String>,
    pub feature_id_keys: Vec<String>,
    pub gene_id_keys: Vec<String>,
    pub tag_keys: Vec<String>,

    /// Feature types that count as exons (default: ["exon"])
    pub exon_feature_types: Vec<String>,

    /// Feature types that describe whole transcripts and may carry tags
    pub transcript_feature_types: Vec<String>,
}

impl Default for AnnotationKeys {
    fn default() -> Self {
        Self {
            transcript_id_keys: vec!["transcript_id".into(), "transcript".into()],
            parent_keys: vec!["Parent".into()],
            feature_id_keys: vec!["ID".into()],
            gene_id_keys: vec!["gene_id".into(), "gene".into(), "GeneID".into()],
            tag_keys: vec!["tag".into()],
            exon_feature_types: vec!["exon".into()],
            transcript_feature_types: vec!["transcript".into(), "mRNA".into()],
        }
    }
}

/// Exon and transcript features of one annotation.
///
/// - exons are deduplicated by location and know their transcripts
/// - transcripts carry their tags and exon ids
/// - exon boundaries are indexed per (chromosome, strand) for junction matching
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotationIndex {
    pub chr_names: Vec<String>,

    exons: Vec<Exon>,
    exon_by_id: HashMap<String, ExonId>,

    transcripts: Vec<Transcript>,
    tx_by_id: HashMap<String, TranscriptId>,

    // (chrom, strand, coordinate) -> exons with that start / stop
    by_start: HashMap<(String, Strand, u32), Vec<ExonId>>,
    by_stop: HashMap<(String, Strand, u32), Vec<ExonId>>,
}

/// Short human-readable summary, one line per chromosome.
impl fmt::Display for AnnotationIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n_tagged = self.transcripts.iter().filter(|t| !t.tags().is_empty()).count();

        writeln!(
            f,
            "AnnotationIndex: {} exons, {} transcripts ({} tagged), {} chromosomes",
            self.exons.len(),
            self.transcripts.len(),
            n_tagged,
            self.chr_names.len()
        )?;

        for chr_name in &self.chr_names {
            let n_exons = self.exons_on(chr_name).len();
            let n_txs = self.transcripts.iter().filter(|t| &t.chrom == chr_name).count();
            writeln!(f, "  - {}: exons={}, transcripts={}", chr_name, n_exons, n_txs)?;
        }

        Ok(())
    }
}

impl AnnotationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a GTF/GFF3 path; `.gz` files are decompressed on the fly.
    pub fn from_path<P: AsRef<Path>>(path: P, keys: AnnotationKeys) -> anyhow::Result<Self> {
        let path = path.as_ref();

        let is_gz = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("gz"))
            .unwrap_or(false);

        let f = File::open(path)
            .with_context(|| format!("open annotation file {}", path.display()))?;
        let reader: Box<dyn BufRead> = if is_gz {
            Box::new(BufReader::new(GzDecoder::new(f)))
        } else {
            Box::new(BufReader::new(f))
        };

        Self::new()
            .from_reader(reader, keys)
            .with_context(|| format!("build annotation index from {}", path.display()))
    }

    /// Build an index directly from a GTF/GFF3 reader.
    ///
    /// Exon lines create (or reuse) an exon at their location and attach it to
    /// every transcript they name. Tags are collected from exon and transcript lines.
    ///
    /// # Example
    /// ```
    /// use std::io::Cursor;
    /// use splice_events::index::{AnnotationIndex, AnnotationKeys};
    ///
    /// let gtf = "\
    /// chr1\tsrc\texon\t101\t150\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\"; tag \"basic\";\n\
    /// chr1\tsrc\texon\t201\t250\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\"; tag \"basic\";\n";
    ///
    /// let idx = AnnotationIndex::new()
    ///     .from_reader(Cursor::new(gtf.as_bytes()), AnnotationKeys::default())
    ///     .unwrap();
    ///
    /// assert_eq!(idx.exons().len(), 2);
    /// assert_eq!(idx.transcript("T1").unwrap().tags(), ["basic"]);
    /// ```
    pub fn from_reader<R: BufRead>(
        mut self,
        reader: R,
        keys: AnnotationKeys,
    ) -> Result<Self, ParseError> {
        for rec in AnnotationReader::new(reader).records() {
            let rec = rec?;

            if rec.is_feature(&keys.exon_feature_types) {
                self.add_exon_record(&rec, &keys)?;
            } else if rec.is_feature(&keys.transcript_feature_types) {
                let Some(tx_key) = rec
                    .pick_first_attr(&keys.transcript_id_keys)
                    .or_else(|| rec.pick_first_attr(&keys.feature_id_keys))
                else {
                    continue;
                };
                let tid = self.intern_tx(&rec, &keys, &tx_key);
                self.add_tags(tid, &rec, &keys);
            }
        }

        self.finalize();
        Ok(self)
    }

    pub fn exons(&self) -> &[Exon] {
        &self.exons
    }

    pub fn transcripts(&self) -> &[Transcript] {
        &self.transcripts
    }

    /// Exon by item id (`exon:chrom:start-stop:strand`).
    pub fn exon(&self, id: &str) -> Option<&Exon> {
        self.exon_by_id.get(id).map(|&i| &self.exons[i])
    }

    pub fn transcript(&self, id: &str) -> Option<&Transcript> {
        self.tx_by_id.get(id).map(|&i| &self.transcripts[i])
    }

    /// Exons on one chromosome, in start order.
    pub fn exons_on(&self, chrom: &str) -> Vec<&Exon> {
        let mut out: Vec<&Exon> = self.exons.iter().filter(|e| e.chrom == chrom).collect();
        out.sort_by_key(|e| (e.start, e.stop));
        out
    }

    /// Exons on `chrom`/`strand` whose first base is `start`.
    pub fn exons_starting_at(&self, chrom: &str, strand: Strand, start: u32) -> Vec<&Exon> {
        self.lookup(&self.by_start, chrom, strand, start)
    }

    /// Exons on `chrom`/`strand` whose last base is `stop`.
    pub fn exons_ending_at(&self, chrom: &str, strand: Strand, stop: u32) -> Vec<&Exon> {
        self.lookup(&self.by_stop, chrom, strand, stop)
    }

    /// Ids of the transcripts that contain every one of the given exons.
    ///
    /// Unknown exon ids yield no transcripts.
    pub fn transcripts_with_exons(&self, exon_ids: &[&str]) -> Vec<String> {
        self.transcripts_with_without(exon_ids, &[])
    }

    /// Ids of the transcripts that contain every exon of `with` and none of `without`.
    ///
    /// Unknown ids in `without` exclude nothing.
    pub fn transcripts_with_without(&self, with: &[&str], without: &[&str]) -> Vec<String> {
        let excluded: Vec<ExonId> = without
            .iter()
            .filter_map(|id| self.exon(id))
            .map(|e| e.idx)
            .collect();

        let mut resolved: Vec<&Exon> = Vec::with_capacity(with.len());
        for id in with {
            match self.exon(id) {
                Some(e) => resolved.push(e),
                None => return Vec::new(),
            }
        }

        let Some((first, rest)) = resolved.split_first() else {
            return Vec::new();
        };

        let hits: BTreeSet<&str> = first
            .transcripts()
            .iter()
            .map(|&tid| &self.transcripts[tid])
            .filter(|tx| rest.iter().all(|e| tx.contains_exon(e.idx)))
            .filter(|tx| !excluded.iter().any(|&e| tx.contains_exon(e)))
            .map(|tx| tx.id.as_str())
            .collect();

        hits.into_iter().map(str::to_string).collect()
    }

    // -----------------------
    // Internal helpers
    // -----------------------

    fn lookup(
        &self,
        table: &HashMap<(String, Strand, u32), Vec<ExonId>>,
        chrom: &str,
        strand: Strand,
        pos: u32,
    ) -> Vec<&Exon> {
        table
            .get(&(chrom.to_string(), strand, pos))
            .map(|ids| ids.iter().map(|&i| &self.exons[i]).collect())
            .unwrap_or_default()
    }

    fn add_exon_record(&mut self, rec: &AnnotationRecord, keys: &AnnotationKeys) -> Result<(), ParseError> {
        let tx_keys: Vec<String> = match rec.pick_first_attr(&keys.transcript_id_keys) {
            Some(k) => vec![k],
            None => keys
                .parent_keys
                .iter()
                .flat_map(|k| rec.attr_values(k).iter().cloned())
                .collect(),
        };

        if tx_keys.is_empty() {
            return Err(ParseError::MalformedLine {
                line_no: rec.line_no,
                line: format!("{}:{}-{}", rec.seqname, rec.start, rec.end),
                problem: "exon without transcript_id/Parent attribute",
            });
        }

        let exon_id = self.intern_exon(rec);

        for tx_key in tx_keys {
            let tid = self.intern_tx(rec, keys, &tx_key);
            self.add_tags(tid, rec, keys);
            self.transcripts[tid].add_exon(exon_id);
            self.exons[exon_id].add_transcript(tid);
        }

        Ok(())
    }

    fn add_tags(&mut self, tid: TranscriptId, rec: &AnnotationRecord, keys: &AnnotationKeys) {
        for k in &keys.tag_keys {
            for tag in rec.attr_values(k) {
                self.transcripts[tid].add_tag(tag);
            }
        }
    }

    fn intern_chr(&mut self, chr: &str) {
        if !self.chr_names.iter().any(|c| c == chr) {
            self.chr_names.push(chr.to_string());
        }
    }

    fn intern_exon(&mut self, rec: &AnnotationRecord) -> ExonId {
        self.intern_chr(&rec.seqname);

        let exon = Exon::new(self.exons.len(), rec.seqname.as_str(), rec.start, rec.end, rec.strand);
        if let Some(&id) = self.exon_by_id.get(&exon.id) {
            return id;
        }

        let id = exon.idx;
        self.exon_by_id.insert(exon.id.clone(), id);
        self.by_start
            .entry((exon.chrom.clone(), exon.strand, exon.start))
            .or_default()
            .push(id);
        self.by_stop
            .entry((exon.chrom.clone(), exon.strand, exon.stop))
            .or_default()
            .push(id);
        self.exons.push(exon);
        id
    }

    fn intern_tx(&mut self, rec: &AnnotationRecord, keys: &AnnotationKeys, tx_key: &str) -> TranscriptId {
        if let Some(&tid) = self.tx_by_id.get(tx_key) {
            if self.transcripts[tid].gene_id.is_none() {
                self.transcripts[tid].gene_id = rec.pick_first_attr(&keys.gene_id_keys);
            }
            return tid;
        }

        self.intern_chr(&rec.seqname);

        let tid = self.transcripts.len();
        self.transcripts.push(Transcript::new(
            tid,
            tx_key,
            rec.pick_first_attr(&keys.gene_id_keys),
            rec.seqname.as_str(),
            rec.strand,
        ));
        self.tx_by_id.insert(tx_key.to_string(), tid);
        tid
    }

    fn finalize(&mut self) {
        for tx in &mut self.transcripts {
            tx.finalize();
        }
        for exon in &mut self.exons {
            exon.finalize();
        }
    }

    /// Serialize with a small header (magic + crate version) and a bincode payload.
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let mut f = File::create(path)?;

        f.write_all(MAGIC)?;

        let v = VERSION_STR.as_bytes();
        let len = v.len() as u16;
        f.write_all(&len.to_le_bytes())?;
        f.write_all(v)?;

        let payload = bincode::serialize(self)?;
        f.write_all(&payload)?;

        Ok(())
    }

    /// Load an index written by `save()`. Rejects wrong file types and version mismatches.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut f = File::open(path)?;

        let mut magic = [0u8; 4];
        f.read_exact(&mut magic)?;
        if &magic != MAGIC {
            bail!("Not an AnnotationIndex file (bad magic)");
        }

        let mut len_buf = [0u8; 2];
        f.read_exact(&mut len_buf)?;
        let len = u16::from_le_bytes(len_buf) as usize;

        let mut ver_buf = vec![0u8; len];
        f.read_exact(&mut ver_buf)?;
        let file_version = std::str::from_utf8(&ver_buf)?;

        if file_version != VERSION_STR {
            bail!(
                "Index version mismatch: file={}, binary={}",
                file_version,
                VERSION_STR
            );
        }

        let mut payload = Vec::new();
        f.read_to_end(&mut payload)?;
        let idx: Self = bincode::deserialize(&payload)?;

        Ok(idx)
    }
}

impl TranscriptLookup for AnnotationIndex {
    fn transcript(&self, id: &str) -> Option<&Transcript> {
        AnnotationIndex::transcript(self, id)
    }
}
