//! Database access layer for labelconv-srv

pub mod requests;
pub mod sequence;
