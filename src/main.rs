use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, Level};
use simple_logger::init_with_level;

use splice_events::consolidate::save_consolidated;
use splice_events::junctions::{
    adjacent_triples, load_triples, open_table, read_junction_exons, read_junction_ids,
    save_triples, triples_from_exon_lists,
};
use splice_events::{
    annotate_isoforms, consolidate_table, AnnotationIndex, AnnotationKeys, ConsolidateOptions,
    EventTable, JunctionAggregator, Triple,
};

/// Infer skipped-exon and mutually-exclusive-exon events from splice junctions.
#[derive(Parser, Debug)]
#[command(name = "splice-events")]
#[command(author, version, about)]
struct Cli {
    /// Log debug details
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build an annotation index from a GTF/GFF3 file and write it to disk
    Index(IndexArgs),

    /// Load an annotation index from disk and print summary stats
    Stats(StatsArgs),

    /// Pair junctions with their flanking annotated exons
    Triples(TriplesArgs),

    /// Detect, annotate and consolidate splicing events
    Events(EventsArgs),
}

#[derive(Args, Debug)]
struct StatsArgs {
    /// Serialized annotation index
    #[arg(long, short)]
    index: PathBuf,
}

#[derive(Args, Debug)]
struct IndexArgs {
    /// Input annotation file (.gtf/.gff/.gff3, optionally .gz)
    #[arg(long, short)]
    annotation: PathBuf,

    /// Output serialized index file
    #[arg(long, short)]
    index: PathBuf,

    #[command(flatten)]
    keys: KeyArgs,
}

/// Attribute key options; any option left out keeps the library default.
#[derive(Args, Debug)]
struct KeyArgs {
    /// Attribute keys to use for transcript ID (repeatable) [default: transcript_id transcript]
    #[arg(long = "transcript-id-key", value_name = "KEY", num_args = 1..)]
    transcript_id_keys: Vec<String>,

    /// GFF3 exon->transcript linkage keys (repeatable) [default: Parent]
    #[arg(long = "parent-key", value_name = "KEY", num_args = 1..)]
    parent_keys: Vec<String>,

    /// Attribute keys to use for gene ID (repeatable) [default: gene_id gene GeneID]
    #[arg(long = "gene-id-key", value_name = "KEY", num_args = 1..)]
    gene_id_keys: Vec<String>,

    /// Attribute keys holding transcript tags such as `basic` or `CCDS` (repeatable) [default: tag]
    #[arg(long = "tag-key", value_name = "KEY", num_args = 1..)]
    tag_keys: Vec<String>,

    /// Feature types that count as exons (repeatable) [default: exon]
    #[arg(long = "exon-feature-type", value_name = "TYPE", num_args = 1..)]
    exon_feature_types: Vec<String>,
}

impl KeyArgs {
    fn into_keys(self) -> AnnotationKeys {
        fn or_default(given: Vec<String>, default: Vec<String>) -> Vec<String> {
            if given.is_empty() {
                default
            } else {
                given
            }
        }

        let d = AnnotationKeys::default();
        AnnotationKeys {
            transcript_id_keys: or_default(self.transcript_id_keys, d.transcript_id_keys),
            parent_keys: or_default(self.parent_keys, d.parent_keys),
            gene_id_keys: or_default(self.gene_id_keys, d.gene_id_keys),
            tag_keys: or_default(self.tag_keys, d.tag_keys),
            exon_feature_types: or_default(self.exon_feature_types, d.exon_feature_types),
            feature_id_keys: d.feature_id_keys,
            transcript_feature_types: d.transcript_feature_types,
        }
    }
}

/// Where exon and transcript annotation comes from.
#[derive(Args, Debug)]
struct SourceArgs {
    /// Annotation file (.gtf/.gff/.gff3, optionally .gz)
    #[arg(long, short, conflicts_with = "index")]
    annotation: Option<PathBuf>,

    /// Serialized annotation index (see `index`)
    #[arg(long, short)]
    index: Option<PathBuf>,

    #[command(flatten)]
    keys: KeyArgs,
}

impl SourceArgs {
    fn load(self) -> Result<Option<AnnotationIndex>> {
        match (self.annotation, self.index) {
            (Some(path), _) => {
                let idx = AnnotationIndex::from_path(&path, self.keys.into_keys())
                    .with_context(|| format!("building index from {}", path.display()))?;
                Ok(Some(idx))
            }
            (None, Some(path)) => {
                let idx = AnnotationIndex::load(&path)
                    .with_context(|| format!("reading index {}", path.display()))?;
                Ok(Some(idx))
            }
            (None, None) => Ok(None),
        }
    }
}

/// Junction input: bare junction ids (paired with annotated exons) or
/// junctions with their exon lists.
#[derive(Args, Debug)]
struct JunctionArgs {
    /// Junction table, one junction id (chrom:start-stop:strand, intron coordinates) per line;
    /// needs --annotation or --index
    #[arg(long, short, conflicts_with = "junction_exons")]
    junctions: Option<PathBuf>,

    /// Junction table with its exons: junction, upstream exons, downstream exons
    /// (comma separated)
    #[arg(long)]
    junction_exons: Option<PathBuf>,
}

impl JunctionArgs {
    fn is_empty(&self) -> bool {
        self.junctions.is_none() && self.junction_exons.is_none()
    }

    fn triples(&self, idx: Option<&AnnotationIndex>) -> Result<Vec<Triple>> {
        match (&self.junctions, &self.junction_exons, idx) {
            (_, Some(path), _) => {
                let reader = open_table(path).with_context(|| format!("opening {}", path.display()))?;
                let rows = read_junction_exons(reader)
                    .with_context(|| format!("reading junction exons from {}", path.display()))?;
                Ok(triples_from_exon_lists(&rows))
            }
            (Some(path), None, Some(idx)) => {
                let junctions = read_junctions(path)?;
                adjacent_triples(&junctions, idx).context("pairing junctions with exons")
            }
            (Some(_), None, None) => bail!("--junctions needs --annotation or --index"),
            (None, None, _) => bail!("give --junctions or --junction-exons"),
        }
    }
}

#[derive(Args, Debug)]
struct TriplesArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    input: JunctionArgs,

    /// Output triple table (junction, exon, direction)
    #[arg(long, short)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct EventsArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    input: JunctionArgs,

    /// Precomputed triple table (see `triples`)
    #[arg(long, conflicts_with_all = ["junctions", "junction_exons"])]
    triples: Option<PathBuf>,

    /// Output directory for the event tables
    #[arg(long, short = 'd')]
    output_dir: PathBuf,

    /// Seed for random tie-breaks during consolidation
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Number of threads (0 = all available cores)
    #[arg(long, short, default_value_t = 0)]
    threads: usize,
}

fn read_junctions(path: &Path) -> Result<Vec<String>> {
    let reader = open_table(path).with_context(|| format!("opening {}", path.display()))?;
    read_junction_ids(reader).with_context(|| format!("reading junctions from {}", path.display()))
}

fn run_triples(args: TriplesArgs) -> Result<()> {
    let idx = args.source.load()?;
    let triples = args.input.triples(idx.as_ref())?;

    save_triples(&triples, &args.output)
        .with_context(|| format!("writing triples to {}", args.output.display()))?;

    info!("{} triples written to {}", triples.len(), args.output.display());
    Ok(())
}

fn run_events(args: EventsArgs) -> Result<()> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
        .context("setting up the thread pool")?;

    let idx = args.source.load()?;

    let triples: Vec<Triple> = match &args.triples {
        Some(path) => load_triples(path)
            .with_context(|| format!("reading triples from {}", path.display()))?,
        None if args.input.is_empty() => {
            bail!("events needs --triples, --junctions or --junction-exons")
        }
        None => args.input.triples(idx.as_ref())?,
    };

    let aggregator = JunctionAggregator::new(&triples).context("building the relation graph")?;

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;

    let idx = idx.unwrap_or_default();
    let options = ConsolidateOptions {
        seed: args.seed,
        ..ConsolidateOptions::default()
    };

    for table in [aggregator.skipped_exon(), aggregator.mutually_exclusive_exon()] {
        write_events(table, &idx, &options, &args.output_dir)?;
    }

    Ok(())
}

fn write_events(
    mut table: EventTable,
    idx: &AnnotationIndex,
    options: &ConsolidateOptions,
    dir: &Path,
) -> Result<()> {
    let abbr = table.kind.abbreviation();

    annotate_isoforms(&mut table, idx);
    let path = dir.join(format!("{abbr}.tsv"));
    table
        .save(&path)
        .with_context(|| format!("writing {}", path.display()))?;

    let consolidated = consolidate_table(table, idx, options)
        .with_context(|| format!("consolidating {abbr} events"))?;
    let path = dir.join(format!("{abbr}_consolidated.tsv"));
    save_consolidated(&consolidated, &path)
        .with_context(|| format!("writing {}", path.display()))?;

    info!("{} events written to {}", abbr, dir.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::Debug } else { Level::Info };
    init_with_level(level).context("initialising the logger")?;

    match cli.cmd {
        Command::Index(args) => {
            let keys = args.keys.into_keys();

            let idx = AnnotationIndex::from_path(&args.annotation, keys)
                .with_context(|| format!("building index from {}", args.annotation.display()))?;

            println!("{idx}");

            idx.save(&args.index)
                .with_context(|| format!("writing index to {}", args.index.display()))?;

            info!("Index written to {}", args.index.display());
        }

        Command::Stats(args) => {
            let idx = AnnotationIndex::load(&args.index)
                .with_context(|| format!("reading index {}", args.index.display()))?;
            println!("{idx}");
        }

        Command::Triples(args) => run_triples(args)?,

        Command::Events(args) => run_events(args)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_keys(extra: &[&str]) -> AnnotationKeys {
        let mut argv = vec!["splice-events", "index", "-a", "a.gtf", "-i", "a.idx"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().cmd {
            Command::Index(args) => args.keys.into_keys(),
            other => panic!("parsed {other:?}"),
        }
    }

    #[test]
    fn cli_keys_default_to_library_keys() {
        let keys = index_keys(&[]);
        let d = AnnotationKeys::default();
        assert_eq!(keys.transcript_id_keys, d.transcript_id_keys);
        assert_eq!(keys.parent_keys, d.parent_keys);
        assert_eq!(keys.gene_id_keys, d.gene_id_keys);
        assert_eq!(keys.tag_keys, d.tag_keys);
        assert_eq!(keys.exon_feature_types, d.exon_feature_types);
    }

    #[test]
    fn cli_keys_override_only_what_is_given() {
        let keys = index_keys(&["--tag-key", "tags", "label"]);
        assert_eq!(keys.tag_keys, vec!["tags", "label"]);
        assert_eq!(keys.gene_id_keys, AnnotationKeys::default().gene_id_keys);
    }

    #[test]
    fn junction_inputs_are_exclusive() {
        let argv = [
            "splice-events", "triples", "--junctions", "j.tsv", "--junction-exons", "je.tsv", "-o",
            "t.tsv",
        ];
        assert!(Cli::try_parse_from(argv).is_err());
    }
}
