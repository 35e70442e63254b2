//! Subject-scanning tests: the identity-scan scenario, rolling-code
//! equivalence against from-scratch references, chunked-resume fidelity,
//! and discontiguous-template scanning.

use rand::rngs::StdRng;
use rand::SeedableRng;

use seedscan::core::disc_template::DiscTemplate;
use seedscan::core::encoding::PackedSequence;
use seedscan::core::lookup::WordConfig;
use seedscan::core::na_lookup::{MbLookup, SmallNaLookup};
use seedscan::core::na_scan::{
    scan_subject_mb, scan_subject_mb_disc, scan_subject_small, OffsetPair,
};

use super::helpers::{
    random_dna, random_dna_with_n, reference_hits_mb, reference_hits_small, sorted,
};

fn packed(seq: &[u8]) -> PackedSequence {
    PackedSequence::new(seq).unwrap()
}

/// Drive a scan to completion through a bounded buffer, exactly as the
/// engine does.
fn scan_small_to_end(
    lut: &SmallNaLookup,
    subject: &PackedSequence,
    buffer_len: usize,
) -> Vec<OffsetPair> {
    let word_size = lut.config().word_size;
    let mut buffer = vec![OffsetPair::default(); buffer_len];
    let mut hits = Vec::new();
    if subject.len() < word_size {
        return hits;
    }
    let last_start = subject.len() - word_size;
    let mut cursor = 0usize;
    loop {
        let (count, next) = scan_subject_small(lut, subject, cursor, &mut buffer);
        hits.extend_from_slice(&buffer[..count]);
        assert!(
            count > 0 || next > cursor,
            "scan made no progress at cursor {}",
            cursor
        );
        cursor = next;
        if cursor > last_start {
            break;
        }
    }
    hits
}

fn scan_mb_to_end(
    lut: &MbLookup,
    subject: &PackedSequence,
    buffer_len: usize,
) -> Vec<OffsetPair> {
    let word_size = lut.config().word_size;
    let mut buffer = vec![OffsetPair::default(); buffer_len];
    let mut hits = Vec::new();
    if subject.len() < word_size {
        return hits;
    }
    let last_start = subject.len() - word_size;
    let mut cursor = 0usize;
    loop {
        let (count, next) = scan_subject_mb(lut, subject, cursor, &mut buffer);
        hits.extend_from_slice(&buffer[..count]);
        assert!(count > 0 || next > cursor);
        cursor = next;
        if cursor > last_start {
            break;
        }
    }
    hits
}

#[test]
fn test_identity_scan_scenario() {
    // Index ACGTACGTAC with word size 4: seven words, three distinct codes,
    // occurrence counts 2/2/2/1 across the seven probes.
    let seq = b"ACGTACGTAC";
    let query = packed(seq);

    // Stride 1 probes all 7 subject word starts; each probe emits one hit
    // per query occurrence of its code: 2+2+2+1+2+2+2 = 13.
    let cfg = WordConfig::new(4, 1);
    let lut = SmallNaLookup::build(&query, &[(0, query.len())], cfg).unwrap();
    let subject = packed(seq);
    let hits = scan_small_to_end(&lut, &subject, 64);
    assert_eq!(hits.len(), 13);
    // Every pair is a true word match under the end-of-word convention.
    for pair in &hits {
        let q_start = pair.q_off as usize - 4;
        let s_start = pair.s_off as usize - 4;
        assert_eq!(query.word_at(q_start, 4), subject.word_at(s_start, 4));
    }
    // The identity diagonal is present at every probe.
    for probe in 0..=6 {
        let off = (probe + 4) as i32;
        assert!(hits.iter().any(|p| p.q_off == off && p.s_off == off));
    }

    // Stride 4 probes subject word starts {0, 4} only; ACGT has two query
    // occurrences, so each probe yields 2 hits.
    let cfg = WordConfig::new(4, 4);
    let lut = SmallNaLookup::build(&query, &[(0, query.len())], cfg).unwrap();
    let hits = scan_small_to_end(&lut, &subject, 64);
    assert_eq!(
        sorted(hits),
        sorted(vec![
            OffsetPair { q_off: 4, s_off: 4 },
            OffsetPair { q_off: 8, s_off: 4 },
            OffsetPair { q_off: 4, s_off: 8 },
            OffsetPair { q_off: 8, s_off: 8 },
        ])
    );
}

#[test]
fn test_rolling_code_matches_scratch_aligned() {
    let mut rng = StdRng::seed_from_u64(11);
    for round in 0..10 {
        let query = packed(&random_dna(&mut rng, 120));
        let subject = packed(&random_dna(&mut rng, 300 + round));
        let cfg = WordConfig::new(8, 4);
        let lut = SmallNaLookup::build(&query, &[(0, query.len())], cfg).unwrap();

        let scanned = scan_small_to_end(&lut, &subject, 1 << 14);
        let reference = reference_hits_small(&lut, &subject);
        // The rolling path visits the same probes in the same order.
        assert_eq!(scanned, reference);
    }
}

#[test]
fn test_subbyte_stride_one_matches_full_scan() {
    let mut rng = StdRng::seed_from_u64(12);
    for _ in 0..10 {
        let query = packed(&random_dna(&mut rng, 80));
        let subject = packed(&random_dna(&mut rng, 257));
        let cfg = WordConfig::new(6, 1);
        let lut = SmallNaLookup::build(&query, &[(0, query.len())], cfg).unwrap();

        let scanned = scan_small_to_end(&lut, &subject, 1 << 14);
        let reference = reference_hits_small(&lut, &subject);
        assert_eq!(scanned, reference, "stride-1 scan must be bit-identical");
    }
}

#[test]
fn test_subbyte_stride_is_subset_of_full_scan() {
    let mut rng = StdRng::seed_from_u64(13);
    let query = packed(&random_dna(&mut rng, 100));
    let subject = packed(&random_dna(&mut rng, 401));

    let full = {
        let cfg = WordConfig::new(8, 1);
        let lut = SmallNaLookup::build(&query, &[(0, query.len())], cfg).unwrap();
        scan_small_to_end(&lut, &subject, 1 << 15)
    };
    for step in [3usize, 5, 6, 7] {
        let cfg = WordConfig::new(8, step);
        let lut = SmallNaLookup::build(&query, &[(0, query.len())], cfg).unwrap();
        let strided = scan_small_to_end(&lut, &subject, 1 << 15);
        // Exactly the full-scan hits whose probe position lies on the stride.
        let expected: Vec<OffsetPair> = full
            .iter()
            .copied()
            .filter(|p| (p.s_off as usize - 8) % step == 0)
            .collect();
        assert_eq!(strided, expected, "stride {}", step);
    }
}

#[test]
fn test_chunked_resume_loses_nothing() {
    let mut rng = StdRng::seed_from_u64(14);
    let query = packed(&random_dna(&mut rng, 150));
    let subject = packed(&random_dna_with_n(&mut rng, 600, 50));
    let cfg = WordConfig::new(8, 1);
    let lut = SmallNaLookup::build(&query, &[(0, query.len())], cfg).unwrap();

    let unbounded = scan_small_to_end(&lut, &subject, 1 << 16);
    // Tiny buffer: barely above the longest chain, forcing many resumes.
    let chunked = scan_small_to_end(&lut, &subject, lut.longest_chain().max(1) + 2);
    assert_eq!(sorted(unbounded), sorted(chunked));
}

#[test]
fn test_chunked_resume_mb() {
    let mut rng = StdRng::seed_from_u64(15);
    let query = packed(&random_dna(&mut rng, 200));
    let subject = packed(&random_dna(&mut rng, 500));
    let cfg = WordConfig::new(9, 1);
    let lut = MbLookup::build_contiguous(&query, &[(0, query.len())], cfg).unwrap();

    let unbounded = scan_mb_to_end(&lut, &subject, 1 << 16);
    let reference = reference_hits_mb(&lut, &subject);
    assert_eq!(unbounded, reference);

    let chunked = scan_mb_to_end(&lut, &subject, lut.longest_chain() + 1);
    assert_eq!(sorted(reference), sorted(chunked));
}

#[test]
fn test_mb_aligned_rolling_matches_scratch() {
    let mut rng = StdRng::seed_from_u64(16);
    let query = packed(&random_dna(&mut rng, 300));
    let subject = packed(&random_dna(&mut rng, 444));
    let cfg = WordConfig::new(12, 4);
    let lut = MbLookup::build_contiguous(&query, &[(0, query.len())], cfg).unwrap();

    let scanned = scan_mb_to_end(&lut, &subject, 1 << 15);
    let reference = reference_hits_mb(&lut, &subject);
    assert_eq!(scanned, reference);
}

#[test]
fn test_subject_shorter_than_word() {
    let query = packed(b"ACGTACGT");
    let cfg = WordConfig::new(8, 4);
    let lut = SmallNaLookup::build(&query, &[(0, query.len())], cfg).unwrap();
    let subject = packed(b"ACGTA");
    let mut buffer = vec![OffsetPair::default(); 16];
    let (count, next) = scan_subject_small(&lut, &subject, 0, &mut buffer);
    assert_eq!((count, next), (0, 0));
}

#[test]
fn test_ambiguous_query_yields_no_hits_anywhere() {
    let mut rng = StdRng::seed_from_u64(17);
    let query = packed(&vec![b'N'; 64]);
    let cfg = WordConfig::new(8, 1);
    let lut = SmallNaLookup::build(&query, &[(0, query.len())], cfg).unwrap();
    let subject = packed(&random_dna(&mut rng, 300));
    let hits = scan_small_to_end(&lut, &subject, 1 << 12);
    assert!(hits.is_empty());
}

#[test]
fn test_disc_identity_scan_single_template() {
    let mut rng = StdRng::seed_from_u64(18);
    for template in [
        DiscTemplate::Coding11Of16,
        DiscTemplate::Optimal12Of16,
        DiscTemplate::Coding12Of18,
        DiscTemplate::Optimal11Of21,
    ] {
        let seq = random_dna(&mut rng, 90);
        let query = packed(&seq);
        let cfg = WordConfig::new(16, 1);
        let lut = MbLookup::build_discontiguous(&query, &[(0, query.len())], cfg, template, None)
            .unwrap();

        let span = template.span();
        let subject = packed(&seq);
        let mut buffer = vec![OffsetPair::default(); 1 << 14];
        let (count, next) = scan_subject_mb_disc(&lut, &subject, 0, &mut buffer);
        assert_eq!(next, subject.len() - span + 1);

        // The identity diagonal must be present at every window position.
        let hits = &buffer[..count];
        for start in 0..=(subject.len() - span) {
            let off = (start + span) as i32;
            assert!(
                hits.iter().any(|p| p.q_off == off && p.s_off == off),
                "{}: missing identity hit at window end {}",
                template.name(),
                off
            );
        }

        // Determinism: a second scan reproduces the same output.
        let mut buffer2 = vec![OffsetPair::default(); 1 << 14];
        let (count2, _) = scan_subject_mb_disc(&lut, &subject, 0, &mut buffer2);
        assert_eq!(&buffer[..count], &buffer2[..count2]);
    }
}

#[test]
fn test_disc_two_templates_share_one_table() {
    let mut rng = StdRng::seed_from_u64(19);
    let seq = random_dna(&mut rng, 120);
    let query = packed(&seq);
    let cfg = WordConfig::new(16, 1);
    let t1 = DiscTemplate::Coding11Of16;
    let t2 = DiscTemplate::Optimal11Of16;
    let both = MbLookup::build_discontiguous(&query, &[(0, query.len())], cfg, t1, Some(t2))
        .unwrap();
    let only1 =
        MbLookup::build_discontiguous(&query, &[(0, query.len())], cfg, t1, None).unwrap();
    let only2 =
        MbLookup::build_discontiguous(&query, &[(0, query.len())], cfg, t2, None).unwrap();

    let subject = packed(&seq);
    let mut buffer = vec![OffsetPair::default(); 1 << 15];
    let (n_both, _) = scan_subject_mb_disc(&both, &subject, 0, &mut buffer);
    let merged = sorted(buffer[..n_both].to_vec());

    let (n1, _) = scan_subject_mb_disc(&only1, &subject, 0, &mut buffer);
    let mut separate = buffer[..n1].to_vec();
    let (n2, _) = scan_subject_mb_disc(&only2, &subject, 0, &mut buffer);
    separate.extend_from_slice(&buffer[..n2]);

    // The shared-table scan is exactly the union of the two single-template
    // scans: the reserved high bit keeps the code spaces from colliding.
    assert_eq!(merged, sorted(separate));
}

#[test]
fn test_disc_chunked_resume() {
    let mut rng = StdRng::seed_from_u64(20);
    let seq = random_dna(&mut rng, 200);
    let query = packed(&seq);
    let cfg = WordConfig::new(16, 1);
    let t1 = DiscTemplate::Coding11Of16;
    let t2 = DiscTemplate::Optimal11Of16;
    let lut = MbLookup::build_discontiguous(&query, &[(0, query.len())], cfg, t1, Some(t2))
        .unwrap();

    let subject = packed(&seq);
    let span = t1.span();
    let last_start = subject.len() - span;

    let scan_to_end = |buffer_len: usize| -> Vec<OffsetPair> {
        let mut buffer = vec![OffsetPair::default(); buffer_len];
        let mut hits = Vec::new();
        let mut cursor = 0usize;
        loop {
            let (count, next) = scan_subject_mb_disc(&lut, &subject, cursor, &mut buffer);
            hits.extend_from_slice(&buffer[..count]);
            assert!(count > 0 || next > cursor);
            cursor = next;
            if cursor > last_start {
                break;
            }
        }
        hits
    };

    let unbounded = scan_to_end(1 << 15);
    let chunked = scan_to_end(2 * lut.longest_chain() + 1);
    assert_eq!(sorted(unbounded), sorted(chunked));
}
