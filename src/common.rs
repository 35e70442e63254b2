use anyhow::Result;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// One reported seed: a word match between a query and a subject. Offsets
/// are end-of-word base positions, as emitted by the scanners.
#[derive(Debug, Clone)]
pub struct SeedHit {
    pub query_id: String,
    pub subject_id: String,
    pub strand: char,
    pub q_off: i32,
    pub s_off: i32,
}

fn open_writer(out_path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    let stdout = io::stdout();
    Ok(if let Some(path) = out_path {
        Box::new(BufWriter::new(File::create(path)?))
    } else {
        Box::new(BufWriter::new(stdout.lock()))
    })
}

/// Write seed hits as tab-separated rows:
/// query, subject, strand, query offset, subject offset.
pub fn write_seed_hits(hits: &[SeedHit], out_path: Option<&PathBuf>) -> Result<()> {
    let mut writer = open_writer(out_path)?;
    for hit in hits {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            hit.query_id, hit.subject_id, hit.strand, hit.q_off, hit.s_off
        )?;
    }
    Ok(())
}

/// Write pattern matches as tab-separated rows: record, start, length.
pub fn write_pattern_hits(rows: &[(String, i32, i32)], out_path: Option<&PathBuf>) -> Result<()> {
    let mut writer = open_writer(out_path)?;
    for (id, start, length) in rows {
        writeln!(writer, "{}\t{}\t{}", id, start, length)?;
    }
    Ok(())
}
