use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};

use crate::error::Error;

/// Genomic strand/orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Strand {
    Plus,
    Minus,
    Unknown,
}

impl Strand {
    pub fn symbol(self) -> char {
        match self {
            Strand::Plus => '+',
            Strand::Minus => '-',
            Strand::Unknown => '.',
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Strand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Strand::Plus),
            "-" => Ok(Strand::Minus),
            "." | "?" => Ok(Strand::Unknown),
            other => Err(Error::region(other, "strand must be one of '+', '-', '.'")),
        }
    }
}

/// Where an exon lies relative to a junction (or a junction relative to an exon).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Upstream,
    Downstream,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Upstream, Direction::Downstream];

    #[inline]
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Upstream => Direction::Downstream,
            Direction::Downstream => Direction::Upstream,
        }
    }

    /// Slot of this direction in per-direction arrays.
    #[inline]
    pub fn slot(self) -> usize {
        match self {
            Direction::Upstream => 0,
            Direction::Downstream => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Upstream => "upstream",
            Direction::Downstream => "downstream",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "upstream" => Ok(Direction::Upstream),
            "downstream" => Ok(Direction::Downstream),
            other => Err(Error::InvalidDirection(other.to_string())),
        }
    }
}

/// Genomic interval parsed from an item id.
///
/// Accepted forms:
/// - `chrom:start-stop:strand`
/// - `tag:chrom:start-stop:strand` (e.g. `exon:chr1:100-200:+`); the tag is dropped
///
/// `name` keeps the original string so the region can be mapped back to its item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub chrom: String,
    pub start: u32,
    pub stop: u32,
    pub strand: Strand,
}

impl Region {
    pub fn new(chrom: impl Into<String>, start: u32, stop: u32, strand: Strand) -> Self {
        let chrom = chrom.into();
        let name = stringify_location(&chrom, start, stop, strand, None);
        Self {
            name,
            chrom,
            start,
            stop,
            strand,
        }
    }

    /// Same chromosome, same strand, and intersecting `[start, stop)` intervals.
    #[inline]
    pub fn overlaps(&self, other: &Region) -> bool {
        self.chrom == other.chrom
            && self.strand == other.strand
            && self.start < other.stop
            && other.start < self.stop
    }

    /// Positional order: by start, then stop, then name.
    pub fn cmp_start(&self, other: &Region) -> Ordering {
        self.start
            .cmp(&other.start)
            .then_with(|| self.stop.cmp(&other.stop))
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl FromStr for Region {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = token.trim().split(':').collect();
        let (chrom, range, strand) = match fields.as_slice() {
            [chrom, range, strand] => (*chrom, *range, *strand),
            [_tag, chrom, range, strand] => (*chrom, *range, *strand),
            _ => return Err(Error::region(token, "expected [tag:]chrom:start-stop:strand")),
        };

        if chrom.is_empty() {
            return Err(Error::region(token, "empty chromosome"));
        }

        let (start_s, stop_s) = range
            .split_once('-')
            .ok_or_else(|| Error::region(token, "coordinates must look like start-stop"))?;

        let start: u32 = start_s
            .parse()
            .map_err(|_| Error::region(token, format!("bad start '{start_s}'")))?;
        let stop: u32 = stop_s
            .parse()
            .map_err(|_| Error::region(token, format!("bad stop '{stop_s}'")))?;

        if stop < start {
            return Err(Error::region(token, "stop is before start"));
        }

        let strand: Strand = strand.parse().map_err(|_| Error::region(token, "bad strand"))?;

        Ok(Self {
            name: token.trim().to_string(),
            chrom: chrom.to_string(),
            start,
            stop,
            strand,
        })
    }
}

/// Render a location as an item id, optionally prefixed with a type tag.
pub fn stringify_location(
    chrom: &str,
    start: u32,
    stop: u32,
    strand: Strand,
    tag: Option<&str>,
) -> String {
    match tag {
        Some(tag) => format!("{tag}:{chrom}:{start}-{stop}:{strand}"),
        None => format!("{chrom}:{start}-{stop}:{strand}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tagged_and_untagged_regions() {
        let exon: Region = "exon:chr1:100-200:+".parse().unwrap();
        assert_eq!(exon.chrom, "chr1");
        assert_eq!((exon.start, exon.stop), (100, 200));
        assert_eq!(exon.strand, Strand::Plus);
        assert_eq!(exon.name, "exon:chr1:100-200:+");

        let junction: Region = "chr2:201-299:-".parse().unwrap();
        assert_eq!(junction.chrom, "chr2");
        assert_eq!(junction.strand, Strand::Minus);
    }

    #[test]
    fn reject_malformed_regions() {
        assert!("chr1:100:+".parse::<Region>().is_err());
        assert!("chr1:200-100:+".parse::<Region>().is_err());
        assert!("chr1:1-x:+".parse::<Region>().is_err());
        assert!("chr1:1-5:*".parse::<Region>().is_err());
        assert!("a:b:chr1:1-5:+".parse::<Region>().is_err());
    }

    #[test]
    fn overlap_needs_same_chrom_and_strand() {
        let a = Region::new("chr1", 100, 200, Strand::Plus);
        let b = Region::new("chr1", 150, 250, Strand::Plus);
        let c = Region::new("chr1", 150, 250, Strand::Minus);
        let d = Region::new("chr2", 150, 250, Strand::Plus);
        let e = Region::new("chr1", 200, 300, Strand::Plus);

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(!a.overlaps(&d));
        // half-open: touching intervals do not overlap
        assert!(!a.overlaps(&e));
    }

    #[test]
    fn start_order_is_total() {
        let a = Region::new("chr1", 100, 200, Strand::Plus);
        let b = Region::new("chr1", 300, 400, Strand::Plus);
        let c = Region::new("chr2", 100, 200, Strand::Plus);
        assert_eq!(a.cmp_start(&b), Ordering::Less);
        assert_eq!(b.cmp_start(&a), Ordering::Greater);
        assert_ne!(a.cmp_start(&c), Ordering::Equal);
    }

    #[test]
    fn direction_round_trips_through_text() {
        for d in Direction::ALL {
            assert_eq!(d.as_str().parse::<Direction>().unwrap(), d);
            assert_eq!(d.opposite().opposite(), d);
        }
        assert!("sideways".parse::<Direction>().is_err());
    }
}
