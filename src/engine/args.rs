//! Command-line argument definitions for the seed scanner and the PHI
//! pattern search.

use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Query FASTA file (indexed once)
    #[arg(short = 'q', long)]
    pub query: PathBuf,

    /// Subject FASTA file (scanned per record)
    #[arg(short = 's', long)]
    pub subject: PathBuf,

    /// Word size in bases (4-8 thick backbone, 9-12 hash-chained)
    #[arg(short = 'w', long, default_value_t = 8)]
    pub word_size: usize,

    /// Scan stride in bases (default: word size)
    #[arg(long)]
    pub scan_step: Option<usize>,

    /// Discontiguous template, e.g. coding-11-16 (forces the hash-chained
    /// index; the word size option is ignored)
    #[arg(long)]
    pub template: Option<String>,

    /// Second simultaneous template sharing the table (requires --template)
    #[arg(long)]
    pub second_template: Option<String>,

    /// Per-call output capacity; scans resume until each subject is done
    #[arg(long, default_value_t = crate::core::lookup::OFFSET_ARRAY_SIZE)]
    pub max_hits: usize,

    /// Also scan the reverse complement of each subject
    #[arg(long)]
    pub both_strands: bool,

    /// Output path (default: stdout)
    #[arg(short = 'o', long)]
    pub out: Option<PathBuf>,

    /// Worker threads (0 = all cores)
    #[arg(long, default_value_t = 0)]
    pub num_threads: usize,

    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug)]
pub struct PhiArgs {
    /// FASTA file of sequences to search
    #[arg(short = 'q', long)]
    pub query: PathBuf,

    /// PROSITE-style pattern, e.g. "A-x-[DE]"
    #[arg(short = 'p', long)]
    pub pattern: String,

    /// Treat sequences as protein (default: nucleotide)
    #[arg(long)]
    pub protein: bool,

    /// Output path (default: stdout)
    #[arg(short = 'o', long)]
    pub out: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,
}
