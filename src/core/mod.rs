//! The word-finder core: packed sequences, lookup tables, and the subject
//! scanners built on them.

pub mod disc_template;
pub mod encoding;
pub mod lookup;
pub mod na_lookup;
pub mod na_scan;
