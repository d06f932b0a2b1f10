use crate::domain::{LocusTag, ResolutionMethod, ResolutionOutcome};
use crate::heuristics::{Heuristics, Rules};
use crate::lookup::CanonicalLookup;

/// Outcome of one table row's primary identifier, non-coding filter included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowResolution {
    Skipped,
    Unmapped,
    Resolved(LocusTag, ResolutionMethod),
}

pub fn resolve_row(raw_id: &str, lookup: &CanonicalLookup, rules: &Rules) -> RowResolution {
    if rules.is_non_coding(raw_id) {
        return RowResolution::Skipped;
    }
    let outcome = resolve(raw_id, lookup, &rules.heuristics);
    match (outcome.locus_tag, outcome.method) {
        (Some(locus_tag), Some(method)) => RowResolution::Resolved(locus_tag, method),
        _ => RowResolution::Unmapped,
    }
}

/// Strips surrounding whitespace and one leading/trailing significance asterisk.
pub fn clean_identifier(raw_id: &str) -> &str {
    let trimmed = raw_id.trim();
    let trimmed = trimmed.strip_prefix('*').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('*').unwrap_or(trimmed);
    trimmed.trim()
}

pub fn resolve(raw_id: &str, lookup: &CanonicalLookup, heuristics: &Heuristics) -> ResolutionOutcome {
    let id = clean_identifier(raw_id);
    if heuristics.is_missing(id) {
        return ResolutionOutcome::unresolved();
    }

    if lookup.contains_locus_tag(id) {
        return ResolutionOutcome::resolved(id, ResolutionMethod::Direct);
    }
    if let Some(locus_tag) = lookup.alias(id) {
        return ResolutionOutcome::resolved(locus_tag, ResolutionMethod::AliasLookup);
    }

    if let Some((prefix, digits)) = split_numbered(id) {
        for candidate in padded_candidates(prefix, digits, heuristics) {
            if lookup.contains_locus_tag(&candidate) {
                return ResolutionOutcome::resolved(&candidate, ResolutionMethod::RePadded);
            }
            if let Some(locus_tag) = lookup.alias(&candidate) {
                return ResolutionOutcome::resolved(locus_tag, ResolutionMethod::RePadded);
            }
        }
    }

    if id.contains(',') {
        let parts = id
            .split(',')
            .map(clean_identifier)
            .filter(|part| !heuristics.is_missing(part))
            .collect::<Vec<_>>();
        // All parts are tried as locus tags before any alias, so part order does not matter.
        if let Some(part) = parts.iter().find(|part| lookup.contains_locus_tag(part)) {
            return ResolutionOutcome::resolved(part, ResolutionMethod::CompositeDirect);
        }
        if let Some(locus_tag) = parts.iter().find_map(|part| lookup.alias(part)) {
            return ResolutionOutcome::resolved(locus_tag, ResolutionMethod::CompositeLookup);
        }
    }

    ResolutionOutcome::unresolved()
}

fn split_numbered(id: &str) -> Option<(&str, &str)> {
    let (prefix, digits) = id.rsplit_once('_')?;
    if prefix.is_empty() || digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    Some((prefix, digits))
}

fn padded_candidates(prefix: &str, digits: &str, heuristics: &Heuristics) -> Vec<String> {
    let extra = heuristics
        .padding_extra_zeros
        .iter()
        .map(|zeros| digits.len() + zeros);
    let widths = heuristics
        .padding_widths
        .iter()
        .copied()
        .filter(|width| *width > digits.len());

    let mut candidates: Vec<String> = Vec::new();
    for width in extra.chain(widths) {
        let candidate = format!("{prefix}_{digits:0>width$}");
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}
