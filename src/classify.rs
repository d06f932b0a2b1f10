use std::collections::{HashMap, HashSet};

use crate::heuristics::Heuristics;

/// Decides whether a table column holds alternative gene identifiers rather than
/// descriptions, coordinates, flags or measurements.
pub fn is_identifier_column(
    values: &[&str],
    column_name: &str,
    excluded_columns: &HashSet<String>,
    heuristics: &Heuristics,
) -> bool {
    if excluded_columns.contains(column_name.trim()) {
        return false;
    }
    let name = column_name.trim().to_lowercase();
    if contains_any(&name, &heuristics.description_keywords) {
        return false;
    }
    if contains_any(&name, &heuristics.coordinate_keywords) {
        return false;
    }

    let non_empty = values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !heuristics.is_missing(value))
        .collect::<Vec<_>>();
    if non_empty.is_empty() {
        return false;
    }

    if is_low_cardinality(&non_empty, heuristics) {
        return false;
    }
    if non_empty.iter().all(|value| is_numeric(value)) {
        return false;
    }

    let average_length =
        non_empty.iter().map(|value| value.chars().count()).sum::<usize>() as f64
            / non_empty.len() as f64;
    if average_length > heuristics.max_average_length {
        return false;
    }

    if contains_any(&name, &heuristics.identifier_keywords) {
        return true;
    }

    let with_space = non_empty.iter().filter(|value| value.contains(' ')).count();
    (with_space as f64 / non_empty.len() as f64) < heuristics.max_space_ratio
}

fn contains_any(name: &str, keywords: &[String]) -> bool {
    keywords
        .iter()
        .any(|keyword| name.contains(keyword.to_lowercase().as_str()))
}

fn is_low_cardinality(values: &[&str], heuristics: &Heuristics) -> bool {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        *counts.entry(*value).or_default() += 1;
    }
    let distinct = counts.len();
    if distinct > heuristics.categorical_max_distinct {
        return false;
    }
    let repetition = values.len() as f64 / distinct as f64;
    if repetition >= heuristics.categorical_min_repetition {
        return true;
    }
    // Short flag columns: every value recurs, which identifier columns never do.
    values.len() >= heuristics.categorical_min_values && counts.values().all(|count| *count > 1)
}

/// Plain numbers, or numbers written with internal spaces and a trailing `*`.
fn is_numeric(value: &str) -> bool {
    if value.parse::<f64>().is_ok() {
        return true;
    }
    let compact = value.split_whitespace().collect::<String>();
    compact
        .strip_suffix('*')
        .unwrap_or(&compact)
        .parse::<f64>()
        .is_ok()
}
