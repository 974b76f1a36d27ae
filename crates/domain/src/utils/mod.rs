//! Pure helper functions

pub mod format;
pub mod normalize;
