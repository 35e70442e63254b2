//! Query indexing: the thick-backbone lookup table for small word sizes and
//! the hash-chained mega-index for large words and discontiguous templates.
//!
//! Both tables are built once per query, frozen, and then shared immutably
//! across any number of concurrent subject scans. Offsets stored in either
//! table follow the end-of-word convention: an offset is the base position
//! one past the last base of the indexed word, so the smallest legal offset
//! is `word_size` and 0 stays free as the hash-chain sentinel.

use anyhow::{bail, Result};
use rustc_hash::FxHashMap;

use super::disc_template::{DiscTemplate, DISC_PRIMARY_WORD};
use super::encoding::PackedSequence;
use super::lookup::{diagnostics_enabled, PresenceVector, WordConfig, CHAR_SIZE};

/// Inline hits per backbone cell. A cell whose count exceeds this spills
/// every hit to the overflow array and `entries[0]` becomes the overflow
/// cursor; hits for one code never live partially in both places.
pub const HITS_ON_BACKBONE: usize = 3;

/// Largest word size served by the thick backbone (4^8 cells); bigger
/// words go through [`MbLookup`].
pub const SMALL_LOOKUP_MAX_WORD_SIZE: usize = 8;

/// Largest contiguous word size served by the hash-chained table; beyond
/// this the direct-addressed hash array no longer fits a sane memory
/// budget.
pub const MB_LOOKUP_MAX_WORD_SIZE: usize = 12;

/// First allocation of a thin build chain; growth doubles from here.
const THIN_CHAIN_INITIAL_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct BackboneCell {
    pub num_used: i32,
    pub entries: [i32; HITS_ON_BACKBONE],
}

impl Default for BackboneCell {
    fn default() -> Self {
        Self {
            num_used: 0,
            entries: [0; HITS_ON_BACKBONE],
        }
    }
}

/// Thick-backbone lookup table: one cell per word code, hits inline up to
/// [`HITS_ON_BACKBONE`], overflow array beyond that.
pub struct SmallNaLookup {
    backbone: Vec<BackboneCell>,
    overflow: Vec<i32>,
    pv: PresenceVector,
    config: WordConfig,
    longest_chain: usize,
}

impl SmallNaLookup {
    /// Index every unambiguous word of `query` inside the given half-open
    /// base regions. A region too short to hold a full word contributes
    /// nothing and is not an error.
    pub fn build(
        query: &PackedSequence,
        regions: &[(usize, usize)],
        config: WordConfig,
    ) -> Result<Self> {
        if config.word_size > SMALL_LOOKUP_MAX_WORD_SIZE {
            bail!(
                "word size {} exceeds the thick-backbone limit of {}; use the hash-chained table",
                config.word_size,
                SMALL_LOOKUP_MAX_WORD_SIZE
            );
        }
        let table_size = config.num_codes();

        let mut thin: Vec<Vec<i32>> = vec![Vec::new(); table_size];
        let mut indexed = 0usize;
        let mut ambiguous_skipped = 0usize;

        for_each_query_word(query, regions, &config, |code, offset| {
            let chain = &mut thin[code as usize];
            if chain.capacity() == 0 {
                chain.reserve_exact(THIN_CHAIN_INITIAL_CAPACITY);
            }
            chain.push(offset);
            indexed += 1;
        }, &mut ambiguous_skipped);

        // Freeze the thin chains into cells + overflow.
        let mut backbone = vec![BackboneCell::default(); table_size];
        let mut pv = PresenceVector::new(table_size);
        let overflow_total: usize = thin
            .iter()
            .map(|c| if c.len() > HITS_ON_BACKBONE { c.len() } else { 0 })
            .sum();
        let mut overflow: Vec<i32> = Vec::with_capacity(overflow_total);
        let mut longest_chain = 0usize;

        for (code, chain) in thin.iter().enumerate() {
            let count = chain.len();
            if count == 0 {
                continue;
            }
            longest_chain = longest_chain.max(count);
            pv.set(code);
            backbone[code].num_used = count as i32;
            if count <= HITS_ON_BACKBONE {
                backbone[code].entries[..count].copy_from_slice(chain);
            } else {
                backbone[code].entries[0] = overflow.len() as i32;
                overflow.extend_from_slice(chain);
            }
        }

        if diagnostics_enabled() {
            eprintln!(
                "[DEBUG] SmallNaLookup::build: word_size={}, indexed={}, ambiguous_skipped={}, non_empty={}, overflow={}, longest_chain={}",
                config.word_size,
                indexed,
                ambiguous_skipped,
                pv.set_count(),
                overflow.len(),
                longest_chain
            );
        }

        Ok(Self {
            backbone,
            overflow,
            pv,
            config,
            longest_chain,
        })
    }

    /// Query offsets recorded for `code`; empty when the code was never
    /// indexed.
    #[inline(always)]
    pub fn get_hits(&self, code: usize) -> &[i32] {
        debug_assert!(code < self.backbone.len(), "code out of range");
        let cell = unsafe { self.backbone.get_unchecked(code) };
        let num = cell.num_used as usize;
        if num == 0 {
            &[]
        } else if num <= HITS_ON_BACKBONE {
            &cell.entries[..num]
        } else {
            let cursor = cell.entries[0] as usize;
            &self.overflow[cursor..cursor + num]
        }
    }

    #[inline(always)]
    pub fn pv(&self) -> &PresenceVector {
        &self.pv
    }

    #[inline(always)]
    pub fn config(&self) -> &WordConfig {
        &self.config
    }

    /// Longest hit list over all codes; sizes resumable scan buffers.
    #[inline(always)]
    pub fn longest_chain(&self) -> usize {
        self.longest_chain
    }
}

/// Hash-chained lookup table ("mega-index"): a direct-addressed head array
/// plus per-offset next pointers. `hashtable[code] == 0` means empty and
/// `next_pos[off] == 0` ends a chain; both are safe because stored offsets
/// are always >= word_size >= 1.
pub struct MbLookup {
    hashtable: Vec<i32>,
    next_pos: Vec<i32>,
    /// Chain links for offsets inserted under the second template; a query
    /// offset can sit on one chain per template, so the second template
    /// gets its own link array while sharing the tagged hashtable.
    next_pos2: Vec<i32>,
    pv: PresenceVector,
    config: WordConfig,
    template: Option<DiscTemplate>,
    second_template: Option<DiscTemplate>,
    longest_chain: usize,
}

impl MbLookup {
    /// Build the contiguous-word variant.
    pub fn build_contiguous(
        query: &PackedSequence,
        regions: &[(usize, usize)],
        config: WordConfig,
    ) -> Result<Self> {
        if config.word_size > MB_LOOKUP_MAX_WORD_SIZE {
            bail!(
                "word size {} exceeds the hash-table limit of {}",
                config.word_size,
                MB_LOOKUP_MAX_WORD_SIZE
            );
        }
        let hashsize = config.num_codes();
        let mut table = Self::empty(query, config, hashsize, None, None);
        let mut chain_counts: FxHashMap<usize, usize> = FxHashMap::default();
        let mut indexed = 0usize;
        let mut ambiguous_skipped = 0usize;

        {
            let t = &mut table;
            let counts = &mut chain_counts;
            for_each_query_word(query, regions, &config, |code, offset| {
                t.insert(code as usize, offset, false);
                *counts.entry(code as usize).or_insert(0) += 1;
                indexed += 1;
            }, &mut ambiguous_skipped);
        }

        table.finish(chain_counts, indexed, ambiguous_skipped);
        Ok(table)
    }

    /// Build the discontiguous variant for one template, or for two
    /// templates sharing the table through the reserved high bit.
    ///
    /// Passing two templates with different weights or spans is a
    /// configuration error, not an input error.
    pub fn build_discontiguous(
        query: &PackedSequence,
        regions: &[(usize, usize)],
        config: WordConfig,
        template: DiscTemplate,
        second_template: Option<DiscTemplate>,
    ) -> Result<Self> {
        if let Some(second) = second_template {
            assert_eq!(
                template.weight(),
                second.weight(),
                "simultaneous templates must share one index width"
            );
            assert_eq!(
                template.span(),
                second.span(),
                "simultaneous templates must share one window span"
            );
            assert_ne!(template, second, "second template must differ");
        }
        // One extra address bit keeps the two template code spaces apart.
        let hashsize = template.num_codes() << usize::from(second_template.is_some());
        let mut table = Self::empty(query, config, hashsize, Some(template), second_template);
        let mut chain_counts: FxHashMap<usize, usize> = FxHashMap::default();
        let mut indexed = 0usize;
        let mut ambiguous_skipped = 0usize;

        let span = template.span();
        let second_bit = table.second_code_bit();
        for &(from, to) in regions {
            let to = to.min(query.len());
            if to < from + span {
                continue;
            }
            // offset = window end position, in [from + span, to]
            for offset in (from + span)..=to {
                let start = offset - span;
                if query.has_ambiguous_in_range(start, offset) {
                    ambiguous_skipped += 1;
                    continue;
                }
                let word = query.word_at(start, DISC_PRIMARY_WORD);
                let extra = if span > DISC_PRIMARY_WORD {
                    query.word_at(start + DISC_PRIMARY_WORD, span - DISC_PRIMARY_WORD)
                } else {
                    0
                };
                let code = template.compute_index(word, extra);
                table.insert(code, offset as i32, false);
                *chain_counts.entry(code).or_insert(0) += 1;
                indexed += 1;
                if let Some(second) = second_template {
                    let code2 = second.compute_index(word, extra) | second_bit;
                    table.insert(code2, offset as i32, true);
                    *chain_counts.entry(code2).or_insert(0) += 1;
                    indexed += 1;
                }
            }
        }

        table.finish(chain_counts, indexed, ambiguous_skipped);
        Ok(table)
    }

    fn empty(
        query: &PackedSequence,
        config: WordConfig,
        hashsize: usize,
        template: Option<DiscTemplate>,
        second_template: Option<DiscTemplate>,
    ) -> Self {
        // One next_pos slot per query offset, plus slot 0 for the sentinel.
        let next_len = query.len() + 1;
        Self {
            hashtable: vec![0i32; hashsize],
            next_pos: vec![0i32; next_len],
            next_pos2: if second_template.is_some() {
                vec![0i32; next_len]
            } else {
                Vec::new()
            },
            pv: PresenceVector::new(hashsize),
            config,
            template,
            second_template,
            longest_chain: 0,
        }
    }

    #[inline]
    fn insert(&mut self, code: usize, offset: i32, second: bool) {
        debug_assert!(offset >= 1, "offset 0 is the chain sentinel");
        let links = if second {
            &mut self.next_pos2
        } else {
            &mut self.next_pos
        };
        links[offset as usize] = self.hashtable[code];
        self.hashtable[code] = offset;
        self.pv.set(code);
    }

    fn finish(
        &mut self,
        chain_counts: FxHashMap<usize, usize>,
        indexed: usize,
        ambiguous_skipped: usize,
    ) {
        self.longest_chain = chain_counts.values().copied().max().unwrap_or(0);
        if diagnostics_enabled() {
            eprintln!(
                "[DEBUG] MbLookup::build: hashsize={}, template={:?}, indexed={}, ambiguous_skipped={}, non_empty={}, longest_chain={}",
                self.hashtable.len(),
                self.template.map(|t| t.name()),
                indexed,
                ambiguous_skipped,
                self.pv.set_count(),
                self.longest_chain
            );
        }
    }

    /// The OR-mask distinguishing second-template codes. Zero when the
    /// table carries at most one template.
    #[inline(always)]
    pub fn second_code_bit(&self) -> usize {
        match (self.template, self.second_template) {
            (Some(t), Some(_)) => 1usize << (2 * t.weight()),
            _ => 0,
        }
    }

    /// Walk the chain for `code`, yielding stored query offsets
    /// (most recently inserted first).
    #[inline(always)]
    pub fn chain(&self, code: usize) -> MbChain<'_> {
        debug_assert!(code < self.hashtable.len(), "code out of range");
        let links = if self.second_code_bit() != 0 && code & self.second_code_bit() != 0 {
            &self.next_pos2
        } else {
            &self.next_pos
        };
        MbChain {
            cur: unsafe { *self.hashtable.get_unchecked(code) },
            links,
        }
    }

    #[inline(always)]
    pub fn pv(&self) -> &PresenceVector {
        &self.pv
    }

    #[inline(always)]
    pub fn config(&self) -> &WordConfig {
        &self.config
    }

    #[inline(always)]
    pub fn template(&self) -> Option<DiscTemplate> {
        self.template
    }

    #[inline(always)]
    pub fn second_template(&self) -> Option<DiscTemplate> {
        self.second_template
    }

    /// Longest chain over all codes; sizes resumable scan buffers.
    #[inline(always)]
    pub fn longest_chain(&self) -> usize {
        self.longest_chain
    }
}

/// Iterator over one hash chain; terminates at the 0 sentinel.
pub struct MbChain<'a> {
    cur: i32,
    links: &'a [i32],
}

impl Iterator for MbChain<'_> {
    type Item = i32;

    #[inline(always)]
    fn next(&mut self) -> Option<i32> {
        if self.cur == 0 {
            return None;
        }
        let offset = self.cur;
        self.cur = self.links[offset as usize];
        Some(offset)
    }
}

/// Shared region walk for contiguous-word indexing. Rolls the word code one
/// base at a time, resets on ambiguous bases, and calls `emit(code, offset)`
/// with the end-of-word offset for every full unambiguous word.
fn for_each_query_word<F: FnMut(u64, i32)>(
    query: &PackedSequence,
    regions: &[(usize, usize)],
    config: &WordConfig,
    mut emit: F,
    ambiguous_skipped: &mut usize,
) {
    for &(from, to) in regions {
        let to = to.min(query.len());
        if to < from + config.word_size {
            continue;
        }
        let mut code: u64 = 0;
        let mut valid_bases = 0usize;
        for pos in from..to {
            if query.is_ambiguous(pos) {
                code = 0;
                valid_bases = 0;
                *ambiguous_skipped += 1;
                continue;
            }
            code = ((code << CHAR_SIZE) | query.base_at(pos) as u64) & config.mask;
            valid_bases += 1;
            if valid_bases < config.word_size {
                continue;
            }
            emit(code, (pos + 1) as i32);
        }
    }
}
