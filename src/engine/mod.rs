//! Search drivers: read FASTA input, build the query index once, scan
//! subjects in parallel against the shared immutable index, and write the
//! resulting seed pairs.

use anyhow::{bail, Context, Result};
use bio::io::fasta;
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::path::Path;

use crate::common::{write_pattern_hits, write_seed_hits, SeedHit};
use crate::core::disc_template::{DiscTemplate, DISC_PRIMARY_WORD};
use crate::core::encoding::{reverse_complement, PackedSequence};
use crate::core::lookup::WordConfig;
use crate::core::na_lookup::{
    MbLookup, SmallNaLookup, MB_LOOKUP_MAX_WORD_SIZE, SMALL_LOOKUP_MAX_WORD_SIZE,
};
use crate::core::na_scan::{
    scan_subject_mb, scan_subject_mb_disc, scan_subject_small, OffsetPair,
};
use crate::phi::{find_matches, PhiAlphabet, PhiPattern};

mod args;
pub use args::{PhiArgs, ScanArgs};

/// The query index behind a scan run: thick backbone for small words,
/// hash-chained table for large words and discontiguous templates. Built
/// once, then borrowed read-only by every scan worker.
enum QueryIndex {
    Small(SmallNaLookup),
    Mb(MbLookup),
}

impl QueryIndex {
    /// Window width in bases; subjects shorter than this produce no hits.
    fn span(&self) -> usize {
        match self {
            QueryIndex::Small(lut) => lut.config().word_size,
            QueryIndex::Mb(lut) => match lut.template() {
                Some(t) => t.span(),
                None => lut.config().word_size,
            },
        }
    }

    fn longest_chain(&self) -> usize {
        match self {
            QueryIndex::Small(lut) => lut.longest_chain(),
            QueryIndex::Mb(lut) => lut.longest_chain(),
        }
    }

    /// Buffer slack a scan call needs beyond the caller's hit budget.
    fn chain_reserve(&self) -> usize {
        match self {
            QueryIndex::Small(lut) => lut.longest_chain(),
            QueryIndex::Mb(lut) => {
                lut.longest_chain() * (1 + lut.second_template().is_some() as usize)
            }
        }
    }

    fn scan(
        &self,
        subject: &PackedSequence,
        start_offset: usize,
        out: &mut [OffsetPair],
    ) -> (usize, usize) {
        match self {
            QueryIndex::Small(lut) => scan_subject_small(lut, subject, start_offset, out),
            QueryIndex::Mb(lut) => {
                if lut.template().is_some() {
                    scan_subject_mb_disc(lut, subject, start_offset, out)
                } else {
                    scan_subject_mb(lut, subject, start_offset, out)
                }
            }
        }
    }
}

fn read_fasta(path: &Path) -> Result<Vec<fasta::Record>> {
    let reader = fasta::Reader::from_file(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let records: Result<Vec<_>, _> = reader.records().collect();
    records.with_context(|| format!("failed to parse {}", path.display()))
}

fn parse_template_arg(name: Option<&str>) -> Result<Option<DiscTemplate>> {
    match name {
        None => Ok(None),
        Some(name) => match DiscTemplate::from_name(name) {
            Some(t) => Ok(Some(t)),
            None => bail!(
                "unknown template '{}'; expected one of: {}",
                name,
                DiscTemplate::ALL
                    .iter()
                    .map(|t| t.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        },
    }
}

fn build_index(
    query: &PackedSequence,
    regions: &[(usize, usize)],
    args: &ScanArgs,
    template: Option<DiscTemplate>,
    second: Option<DiscTemplate>,
) -> Result<QueryIndex> {
    match template {
        Some(t) => {
            let step = args.scan_step.unwrap_or(1);
            let config = WordConfig::new(DISC_PRIMARY_WORD, step);
            Ok(QueryIndex::Mb(MbLookup::build_discontiguous(
                query, regions, config, t, second,
            )?))
        }
        None => {
            let step = args.scan_step.unwrap_or(args.word_size);
            let config = WordConfig::new(args.word_size, step);
            if args.word_size <= SMALL_LOOKUP_MAX_WORD_SIZE {
                Ok(QueryIndex::Small(SmallNaLookup::build(
                    query, regions, config,
                )?))
            } else {
                Ok(QueryIndex::Mb(MbLookup::build_contiguous(
                    query, regions, config,
                )?))
            }
        }
    }
}

/// Scan one subject strand to completion, resuming through the bounded
/// output buffer until the cursor passes the last word.
fn scan_one_strand(
    index: &QueryIndex,
    query_id: &str,
    subject_id: &str,
    seq: &[u8],
    strand: char,
    max_hits: usize,
    hits: &mut Vec<SeedHit>,
) {
    let Some(packed) = PackedSequence::new(seq) else {
        return;
    };
    if packed.len() < index.span() {
        return;
    }
    let last_start = packed.len() - index.span();
    let mut buffer = vec![OffsetPair::default(); max_hits.max(1) + index.chain_reserve()];
    let mut cursor = 0usize;

    loop {
        let (count, next) = index.scan(&packed, cursor, &mut buffer);
        for pair in &buffer[..count] {
            hits.push(SeedHit {
                query_id: query_id.to_string(),
                subject_id: subject_id.to_string(),
                strand,
                q_off: pair.q_off,
                s_off: pair.s_off,
            });
        }
        if next <= cursor && count == 0 {
            break;
        }
        cursor = next;
        if cursor > last_start {
            break;
        }
    }
}

pub fn run_scan(args: ScanArgs) -> Result<()> {
    let num_threads = if args.num_threads == 0 {
        num_cpus::get()
    } else {
        args.num_threads
    };
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .context("failed to build thread pool")?;

    let template = parse_template_arg(args.template.as_deref())?;
    let second = parse_template_arg(args.second_template.as_deref())?;
    if second.is_some() && template.is_none() {
        bail!("--second-template requires --template");
    }
    if template.is_none() && !(4..=MB_LOOKUP_MAX_WORD_SIZE).contains(&args.word_size) {
        bail!(
            "word size must be between 4 and {} bases",
            MB_LOOKUP_MAX_WORD_SIZE
        );
    }
    if let Some(step) = args.scan_step {
        if step == 0 {
            bail!("scan step must be at least 1");
        }
    }

    let queries = read_fasta(&args.query)?;
    let subjects = read_fasta(&args.subject)?;
    if queries.is_empty() || subjects.is_empty() {
        return Ok(());
    }

    let mut all_hits: Vec<SeedHit> = Vec::new();
    for query in &queries {
        let Some(packed_query) = PackedSequence::new(query.seq()) else {
            continue;
        };
        let regions = [(0usize, packed_query.len())];
        let index = build_index(&packed_query, &regions, &args, template, second)?;
        if args.verbose {
            eprintln!(
                "[INFO] indexed query {} ({} bases), longest chain {}",
                query.id(),
                packed_query.len(),
                index.longest_chain()
            );
        }

        let bar = ProgressBar::new(subjects.len() as u64);
        let per_subject: Vec<Vec<SeedHit>> = subjects
            .par_iter()
            .map(|subject| {
                let mut hits = Vec::new();
                scan_one_strand(
                    &index,
                    query.id(),
                    subject.id(),
                    subject.seq(),
                    '+',
                    args.max_hits,
                    &mut hits,
                );
                if args.both_strands {
                    let rc = reverse_complement(subject.seq());
                    scan_one_strand(
                        &index,
                        query.id(),
                        subject.id(),
                        &rc,
                        '-',
                        args.max_hits,
                        &mut hits,
                    );
                }
                bar.inc(1);
                hits
            })
            .collect();
        bar.finish_and_clear();

        for hits in per_subject {
            all_hits.extend(hits);
        }
    }

    if args.verbose {
        eprintln!("[INFO] {} seed hits total", all_hits.len());
    }
    write_seed_hits(&all_hits, args.out.as_ref())
}

pub fn run_phi(args: PhiArgs) -> Result<()> {
    let alphabet = if args.protein {
        PhiAlphabet::Protein
    } else {
        PhiAlphabet::Dna
    };
    let pattern = PhiPattern::parse(&args.pattern, alphabet)
        .with_context(|| format!("failed to parse pattern '{}'", args.pattern))?;
    if args.verbose {
        eprintln!(
            "[INFO] pattern: {} variant(s), min length {}, match probability {:.3e}",
            pattern.num_variants(),
            pattern.min_length,
            pattern.probability
        );
    }

    let records = read_fasta(&args.query)?;
    let mut rows: Vec<(String, i32, i32)> = Vec::new();
    for record in &records {
        let matches = find_matches(&pattern, record.seq());
        for i in 0..matches.len() {
            let (start, length) = matches.get(i);
            rows.push((record.id().to_string(), start, length));
        }
    }
    write_pattern_hits(&rows, args.out.as_ref())
}
