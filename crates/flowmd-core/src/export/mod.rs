//! Export of finalized claims.

mod claim;

pub use claim::*;
