use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::annotation::io::ParseError;
use crate::index::{AnnotationIndex, AnnotationKeys};

/// High-level builder for creating an `AnnotationIndex` from a GTF/GFF3 file.
///
/// - parses the whole file (optionally gzipped)
/// - configurable attribute keys for transcript ids, parents, genes and tags
#[derive(Debug, Clone, Default)]
pub struct AnnotationBuilder {
    pub keys: AnnotationKeys,
}

fn owned(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|s| s.to_string()).collect()
}

impl AnnotationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript_id_keys(mut self, keys: &[&str]) -> Self {
        self.keys.transcript_id_keys = owned(keys);
        self
    }

    /// GFF3 exon->transcript linking keys (usually ["Parent"]).
    pub fn parent_keys(mut self, keys: &[&str]) -> Self {
        self.keys.parent_keys = owned(keys);
        self
    }

    pub fn gene_id_keys(mut self, keys: &[&str]) -> Self {
        self.keys.gene_id_keys = owned(keys);
        self
    }

    pub fn tag_keys(mut self, keys: &[&str]) -> Self {
        self.keys.tag_keys = owned(keys);
        self
    }

    pub fn exon_feature_types(mut self, types: &[&str]) -> Self {
        self.keys.exon_feature_types = owned(types);
        self
    }

    pub fn transcript_feature_types(mut self, types: &[&str]) -> Self {
        self.keys.transcript_feature_types = owned(types);
        self
    }

    pub fn build_from_reader<R: BufRead>(&self, reader: R) -> Result<AnnotationIndex, ParseError> {
        AnnotationIndex::new().from_reader(reader, self.keys.clone())
    }

    /// Build from a file path; `.gz` is read through a gzip decoder.
    pub fn build_from_path<P: AsRef<Path>>(&self, path: P) -> Result<AnnotationIndex, ParseError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;

        let is_gz = path.extension().map(|e| e == "gz").unwrap_or(false);

        if is_gz {
            let decoder = flate2::read::GzDecoder::new(file);
            self.build_from_reader(BufReader::new(decoder))
        } else {
            self.build_from_reader(BufReader::new(file))
        }
    }
}
