//! Reusable `applies_to` building blocks.

use super::RunContext;

/// At least one file matches any of `patterns`.
pub fn has_files(ctx: &RunContext, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| ctx.has_files(p))
}

/// A prior dependency mentions `needle` in its group or artifact.
///
/// Only sees dependencies when the extractor declares
/// `FactKind::Dependency` in its reads.
pub fn has_dependency(ctx: &RunContext, needle: &str) -> bool {
    ctx.prior_facts().dependencies().any(|d| d.mentions(needle))
}

pub fn has_any_dependency(ctx: &RunContext, needles: &[&str]) -> bool {
    needles.iter().any(|n| has_dependency(ctx, n))
}
