// Proofstamp: adaptive proof-of-capture watermark overlays

pub mod codec;
pub mod config;
pub mod logging;
pub mod watermark;
