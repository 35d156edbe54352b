//! Hit resolution: merging shard occurrences, confirming them against an
//! alignment report, and aggregating the survivors.
//!
//! The pipeline for one motif query:
//!
//! 1. **Merge**: decoded occurrences from every shard are merged into one
//!    [`merger::Hit`], deduplicated per genome
//! 2. **Filter**: the alignment report decides which genes are confirmed hits
//!    ([`filter::AlignmentFilter`])
//! 3. **Aggregate**: confirmed genes and taxon criteria turn the hit into
//!    gene- and genome-centric summaries ([`aggregate::ResultAggregator`])
//!
//! [`engine::ResolutionEngine`] runs the whole pipeline, fetching shards
//! concurrently.

pub mod aggregate;
pub mod engine;
pub mod filter;
pub mod merger;
