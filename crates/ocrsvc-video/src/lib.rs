//! Video-file OCR: stride sampling, SSIM-gated frame dedup, and cross-frame
//! text-set deduplication (spec.md §4.5, §4.6).

pub mod sampler;
pub mod ssim;
pub mod text_dedup;

pub use sampler::{sample_video, SamplerConfig};
