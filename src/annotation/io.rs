use std::collections::HashMap;
use std::io::BufRead;

use crate::types::Strand;

/// File dialect detected from attribute syntax.
///
/// - GFF3 typically uses: key=value;key2=value2
/// - GTF typically uses: key "value"; key2 "value2";
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Gff3,
    Gtf,
    Unknown,
}

/// A single parsed record line from GTF/GFF3.
///
/// Coordinates are kept as written in the file (1-based, inclusive), because
/// exon ids are built from them.
///
/// Attributes are multi-valued: GTF repeats keys (`tag "basic"; tag "CCDS";`)
/// and GFF3 packs several values behind one key (`tag=basic,CCDS`).
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    pub line_no: usize,
    pub seqname: String,
    pub feature_type: String,
    pub start: u32,
    pub end: u32,
    pub strand: Strand,
    pub attrs: HashMap<String, Vec<String>>,
    pub dialect: Dialect,
}

impl AnnotationRecord {
    /// First value of an attribute.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .get(key)
            .and_then(|v| v.first())
            .map(|s| s.as_str())
    }

    /// All values of an attribute (empty if absent).
    pub fn attr_values(&self, key: &str) -> &[String] {
        self.attrs.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn is_feature(&self, types: &[String]) -> bool {
        types.iter().any(|t| t == &self.feature_type)
    }

    pub fn pick_first_attr(&self, keys: &[String]) -> Option<String> {
        for k in keys {
            if let Some(v) = self.attr(k) {
                let v = v.trim();
                if !v.is_empty() {
                    return Some(v.to_string());
                }
            }
        }
        None
    }
}

/// Parsing errors for GTF/GFF3.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("I/O error while reading annotation: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed GTF/GFF line {line_no} ({problem}): {line}")]
    MalformedLine {
        line_no: usize,
        line: String,
        problem: &'static str,
    },

    #[error("bad coordinates in line {line_no}: {line}")]
    BadCoordinates { line_no: usize, line: String },
}

/// Low-level streaming parser for GTF/GFF3 files.
///
/// Most users should go through [`crate::annotation::AnnotationBuilder`].
///
/// # Example
/// ```
/// use std::io::Cursor;
/// use splice_events::annotation::io::AnnotationReader;
///
/// let gtf = "chr1\tsrc\texon\t101\t150\t.\t+\t.\ttranscript_id \"T1\"; tag \"basic\"; tag \"CCDS\";\n";
/// let recs: Vec<_> = AnnotationReader::new(Cursor::new(gtf))
///     .records()
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(recs[0].attr_values("tag"), ["basic", "CCDS"]);
/// ```
pub struct AnnotationReader<R: BufRead> {
    reader: R,
    buf: String,
    line_no: usize,
}

impl<R: BufRead> AnnotationReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            line_no: 0,
        }
    }

    /// Iterator over parsed records; blank lines and `#` comments are skipped.
    pub fn records(mut self) -> impl Iterator<Item = Result<AnnotationRecord, ParseError>> {
        std::iter::from_fn(move || loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => self.line_no += 1,
                Err(e) => return Some(Err(ParseError::Io(e))),
            }

            let line = self.buf.trim_end_matches(&['\n', '\r'][..]);
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            return Some(parse_record_line(line, self.line_no));
        })
    }
}

/// Parse a single non-comment line into an `AnnotationRecord`.
pub fn parse_record_line(line: &str, line_no: usize) -> Result<AnnotationRecord, ParseError> {
    let malformed = |problem: &'static str| ParseError::MalformedLine {
        line_no,
        line: line.to_string(),
        problem,
    };

    // seqname source feature start end score strand phase attributes
    let cols: Vec<&str> = line.split('\t').collect();
    if cols.len() != 9 {
        return Err(malformed("expected 9 tab-separated columns"));
    }

    let bad_coords = || ParseError::BadCoordinates {
        line_no,
        line: line.to_string(),
    };
    let start: u32 = cols[3].parse().map_err(|_| bad_coords())?;
    let end: u32 = cols[4].parse().map_err(|_| bad_coords())?;
    if start == 0 || end < start {
        return Err(bad_coords());
    }

    let strand = match cols[6] {
        "+" => Strand::Plus,
        "-" => Strand::Minus,
        "." | "?" => Strand::Unknown,
        _ => return Err(malformed("strand must be '+', '-', '.' or '?'")),
    };

    let (dialect, attrs) = parse_attributes(cols[8]);

    Ok(AnnotationRecord {
        line_no,
        seqname: cols[0].to_string(),
        feature_type: cols[2].to_string(),
        start,
        end,
        strand,
        attrs,
        dialect,
    })
}

/// Parse the attributes column for either GFF3 or GTF.
///
/// `=` anywhere means GFF3, quotes mean GTF; otherwise each part is tried both ways.
pub fn parse_attributes(s: &str) -> (Dialect, HashMap<String, Vec<String>>) {
    let s = s.trim();

    let dialect = if s.contains('=') {
        Dialect::Gff3
    } else if s.contains('"') {
        Dialect::Gtf
    } else {
        Dialect::Unknown
    };

    let mut map: HashMap<String, Vec<String>> = HashMap::new();

    for part in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let gff_style = match dialect {
            Dialect::Gff3 => true,
            Dialect::Gtf => false,
            Dialect::Unknown => part.contains('='),
        };

        let (key, rest) = if gff_style {
            part.split_once('=').unwrap_or((part, ""))
        } else {
            part.split_once(char::is_whitespace).unwrap_or((part, ""))
        };

        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        let values = map.entry(key.to_string()).or_default();
        if gff_style {
            values.extend(
                rest.split(',')
                    .map(unquote)
                    .filter(|v| !v.is_empty()),
            );
        } else {
            let value = unquote(rest);
            if !value.is_empty() {
                values.push(value);
            }
        }
    }

    map.retain(|_, v| !v.is_empty());
    (dialect, map)
}

fn unquote(v: &str) -> String {
    let v = v.trim();
    let v = v.strip_prefix('"').unwrap_or(v);
    let v = v.strip_suffix('"').unwrap_or(v);
    v.to_string()
}
