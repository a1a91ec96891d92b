#![forbid(unsafe_code)]
#![warn(clippy::wildcard_enum_match_arm)]

pub mod collections;
pub mod lir;
pub mod regalloc;
pub mod samples;
