//! Checksum instrumentation and the wire preamble

mod checksum;
pub mod preamble;

pub use checksum::{
    ChecksumPolicy, InsertChecksumOps, CHECKSUM_MUTATOR_NAME, CHECKSUM_UPDATE_OPS, GLOBAL_KEY,
};
pub use preamble::{
    wrap_source, CHECKSUM_LABEL, CHECKSUM_SEED, CHECKSUM_VARIABLE, GLOBAL_VARIABLE,
    OUTPUT_VARIABLE, PREAMBLE_PREFIX, PREAMBLE_SUFFIX,
};
