//! Subject scanning: slide a word window across a packed subject at the
//! configured stride, test the presence vector, and emit every
//! `(query_offset, subject_offset)` pair the backbone stores for the code.
//!
//! All scanners share one contract:
//!
//! * `start_offset` is the base position of the first word to probe; the
//!   returned cursor is the base position of the next unprobed word. A scan
//!   resumed at the returned cursor never skips a code.
//! * Emitted offsets are end-of-word base positions on both sides, matching
//!   the indexer.
//! * Output goes into the caller-owned slice; when the hits for the current
//!   code no longer fit, the scan returns early with the cursor parked on
//!   that word, and the resumed call re-emits that one code in full. The
//!   slice must hold at least `longest_chain()` entries for the scan to
//!   make progress.
//!
//! The byte-aligned paths keep the rolling code with shift-and-mask
//! arithmetic, O(1) per step; the sub-byte paths assemble each window from
//! its covering bytes at the exact base position, so a stride-1 unaligned
//! scan is bit-identical to a from-scratch full scan.

use super::disc_template::DISC_PRIMARY_WORD;
use super::encoding::{PackedSequence, COMPRESSION_RATIO};
use super::na_lookup::{MbLookup, SmallNaLookup};

/// One exact-match seed: query offset and subject offset, both end-of-word.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OffsetPair {
    pub q_off: i32,
    pub s_off: i32,
}

/// Scan a subject against a thick-backbone table. Returns the number of
/// pairs written and the resume cursor.
pub fn scan_subject_small(
    lookup: &SmallNaLookup,
    subject: &PackedSequence,
    start_offset: usize,
    out: &mut [OffsetPair],
) -> (usize, usize) {
    if lookup.config().full_byte_scan {
        scan_small_aligned(lookup, subject, start_offset, out)
    } else {
        scan_small_unaligned(lookup, subject, start_offset, out)
    }
}

fn scan_small_aligned(
    lookup: &SmallNaLookup,
    subject: &PackedSequence,
    start_offset: usize,
    out: &mut [OffsetPair],
) -> (usize, usize) {
    let cfg = lookup.config();
    let word_size = cfg.word_size;
    let reduced = cfg.reduced_wordsize;
    let step_bytes = cfg.scan_step / COMPRESSION_RATIO;
    debug_assert!(start_offset % COMPRESSION_RATIO == 0, "aligned scan needs a byte-aligned cursor");

    if subject.len() < word_size {
        return (0, start_offset);
    }
    let last_byte = (subject.len() - word_size) / COMPRESSION_RATIO;
    let mut byte = start_offset / COMPRESSION_RATIO;
    if byte > last_byte {
        return (0, start_offset);
    }

    let mut code: u64 = 0;
    for i in 0..reduced {
        code = (code << 8) | subject.get_byte(byte + i) as u64;
    }

    let mut total = 0usize;
    loop {
        if lookup.pv().test(code as usize) {
            let hits = lookup.get_hits(code as usize);
            if total + hits.len() > out.len() {
                return (total, byte * COMPRESSION_RATIO);
            }
            let s_off = (byte * COMPRESSION_RATIO + word_size) as i32;
            for &q_off in hits {
                out[total] = OffsetPair { q_off, s_off };
                total += 1;
            }
        }

        byte += step_bytes;
        if byte > last_byte {
            break;
        }
        if step_bytes < reduced {
            // Shift out the oldest bytes, shift in the newest.
            for i in 0..step_bytes {
                code = ((code << 8) & cfg.mask)
                    | subject.get_byte(byte + reduced - step_bytes + i) as u64;
            }
        } else {
            code = 0;
            for i in 0..reduced {
                code = (code << 8) | subject.get_byte(byte + i) as u64;
            }
        }
    }

    (total, byte * COMPRESSION_RATIO)
}

fn scan_small_unaligned(
    lookup: &SmallNaLookup,
    subject: &PackedSequence,
    start_offset: usize,
    out: &mut [OffsetPair],
) -> (usize, usize) {
    let cfg = lookup.config();
    let word_size = cfg.word_size;
    let step = cfg.scan_step;

    if subject.len() < word_size {
        return (0, start_offset);
    }
    let last_start = subject.len() - word_size;
    let mut pos = start_offset;
    let mut total = 0usize;

    while pos <= last_start {
        let code = subject.word_at(pos, word_size);
        if lookup.pv().test(code as usize) {
            let hits = lookup.get_hits(code as usize);
            if total + hits.len() > out.len() {
                return (total, pos);
            }
            let s_off = (pos + word_size) as i32;
            for &q_off in hits {
                out[total] = OffsetPair { q_off, s_off };
                total += 1;
            }
        }
        pos += step;
    }

    (total, pos)
}

/// Scan a subject against a contiguous-word hash-chained table.
pub fn scan_subject_mb(
    lookup: &MbLookup,
    subject: &PackedSequence,
    start_offset: usize,
    out: &mut [OffsetPair],
) -> (usize, usize) {
    assert!(
        lookup.template().is_none(),
        "table was built for discontiguous templates; use scan_subject_mb_disc"
    );
    if lookup.config().full_byte_scan {
        scan_mb_aligned(lookup, subject, start_offset, out)
    } else {
        scan_mb_unaligned(lookup, subject, start_offset, out)
    }
}

/// Emit every chained offset for `code`. The caller has already reserved
/// room for a full chain, so this never overruns `out`.
#[inline(always)]
fn emit_chain(
    lookup: &MbLookup,
    code: usize,
    s_off: i32,
    out: &mut [OffsetPair],
    total: &mut usize,
) {
    for q_off in lookup.chain(code) {
        debug_assert!(*total < out.len());
        out[*total] = OffsetPair { q_off, s_off };
        *total += 1;
    }
}

fn scan_mb_aligned(
    lookup: &MbLookup,
    subject: &PackedSequence,
    start_offset: usize,
    out: &mut [OffsetPair],
) -> (usize, usize) {
    let cfg = lookup.config();
    let word_size = cfg.word_size;
    let reduced = cfg.reduced_wordsize;
    let step_bytes = cfg.scan_step / COMPRESSION_RATIO;
    debug_assert!(start_offset % COMPRESSION_RATIO == 0, "aligned scan needs a byte-aligned cursor");
    debug_assert!(out.len() >= lookup.longest_chain(), "output buffer smaller than longest chain");

    if subject.len() < word_size {
        return (0, start_offset);
    }
    let last_byte = (subject.len() - word_size) / COMPRESSION_RATIO;
    let mut byte = start_offset / COMPRESSION_RATIO;
    if byte > last_byte {
        return (0, start_offset);
    }

    let mut code: u64 = 0;
    for i in 0..reduced {
        code = (code << 8) | subject.get_byte(byte + i) as u64;
    }

    let mut total = 0usize;
    loop {
        if lookup.pv().test(code as usize) {
            // Chain length is unknown until walked; reserve the worst case.
            if out.len() - total < lookup.longest_chain() {
                return (total, byte * COMPRESSION_RATIO);
            }
            let s_off = (byte * COMPRESSION_RATIO + word_size) as i32;
            emit_chain(lookup, code as usize, s_off, out, &mut total);
        }

        byte += step_bytes;
        if byte > last_byte {
            break;
        }
        if step_bytes < reduced {
            for i in 0..step_bytes {
                code = ((code << 8) & cfg.mask)
                    | subject.get_byte(byte + reduced - step_bytes + i) as u64;
            }
        } else {
            code = 0;
            for i in 0..reduced {
                code = (code << 8) | subject.get_byte(byte + i) as u64;
            }
        }
    }

    (total, byte * COMPRESSION_RATIO)
}

fn scan_mb_unaligned(
    lookup: &MbLookup,
    subject: &PackedSequence,
    start_offset: usize,
    out: &mut [OffsetPair],
) -> (usize, usize) {
    let cfg = lookup.config();
    let word_size = cfg.word_size;
    let step = cfg.scan_step;
    debug_assert!(out.len() >= lookup.longest_chain(), "output buffer smaller than longest chain");

    if subject.len() < word_size {
        return (0, start_offset);
    }
    let last_start = subject.len() - word_size;
    let mut pos = start_offset;
    let mut total = 0usize;

    while pos <= last_start {
        let code = subject.word_at(pos, word_size);
        if lookup.pv().test(code as usize) {
            if out.len() - total < lookup.longest_chain() {
                return (total, pos);
            }
            let s_off = (pos + word_size) as i32;
            emit_chain(lookup, code as usize, s_off, out, &mut total);
        }
        pos += step;
    }

    (total, pos)
}

/// Scan a subject against a discontiguous-template table. Probes one or
/// two templates per position; both template's hits land in the same
/// output arrays with identical subject offsets.
pub fn scan_subject_mb_disc(
    lookup: &MbLookup,
    subject: &PackedSequence,
    start_offset: usize,
    out: &mut [OffsetPair],
) -> (usize, usize) {
    let template = lookup
        .template()
        .expect("table was built for contiguous words; use scan_subject_mb");
    let second = lookup.second_template();
    let second_bit = lookup.second_code_bit();
    let span = template.span();
    let step = lookup.config().scan_step;
    // Both templates can fire on one position; park the cursor before
    // either fires unless both chains fit, so a resume duplicates at most
    // the one boundary position.
    let reserve = lookup.longest_chain() * (1 + second.is_some() as usize);
    debug_assert!(out.len() >= reserve, "output buffer smaller than longest chain");

    if subject.len() < span {
        return (0, start_offset);
    }
    let last_start = subject.len() - span;
    let mut pos = start_offset;
    let mut total = 0usize;

    while pos <= last_start {
        let word = subject.word_at(pos, DISC_PRIMARY_WORD);
        let extra = if span > DISC_PRIMARY_WORD {
            subject.word_at(pos + DISC_PRIMARY_WORD, span - DISC_PRIMARY_WORD)
        } else {
            0
        };
        let code = template.compute_index(word, extra);
        let code2 = second.map(|t| t.compute_index(word, extra) | second_bit);

        let any_hit = lookup.pv().test(code)
            || code2.map(|c| lookup.pv().test(c)).unwrap_or(false);
        if any_hit {
            if out.len() - total < reserve {
                return (total, pos);
            }
            let s_off = (pos + span) as i32;
            if lookup.pv().test(code) {
                emit_chain(lookup, code, s_off, out, &mut total);
            }
            if let Some(code2) = code2 {
                if lookup.pv().test(code2) {
                    emit_chain(lookup, code2, s_off, out, &mut total);
                }
            }
        }
        pos += step;
    }

    (total, pos)
}
