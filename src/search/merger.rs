use std::cmp::Ordering;
use crate::query::ast::BinaryOperator;
use crate::search::intermediate::{IntermediateQueryResult, ScoredFieldMatch, ScoredToken, TokenMatchLocation};

/// Documents present on both sides, passed through `merge_document`.
fn intersect_documents<F>(
    left: &IntermediateQueryResult,
    right: &IntermediateQueryResult,
    mut merge_document: F,
) -> IntermediateQueryResult
where
    F: FnMut(&ScoredToken, &ScoredToken) -> Option<ScoredToken>,
{
    let (left, right) = (left.matches(), right.matches());
    let mut merged = Vec::with_capacity(left.len().min(right.len()));
    let (mut i, mut j) = (0, 0);

    while i < left.len() && j < right.len() {
        match left[i].document_id.cmp(&right[j].document_id) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                if let Some(document) = merge_document(&left[i], &right[j]) {
                    merged.push(document);
                }
                i += 1;
                j += 1;
            }
        }
    }

    IntermediateQueryResult::new(merged)
}

/// Same-field pairs of two matched documents, passed through `merge_field`.
/// Documents with no surviving field are dropped.
fn intersect_fields<F>(
    left: &IntermediateQueryResult,
    right: &IntermediateQueryResult,
    mut merge_field: F,
) -> IntermediateQueryResult
where
    F: FnMut(&ScoredFieldMatch, &ScoredFieldMatch) -> Option<ScoredFieldMatch>,
{
    intersect_documents(left, right, |l, r| {
        let fields: Vec<ScoredFieldMatch> = l.field_matches
            .iter()
            .filter_map(|lf| r.field(lf.field_id).and_then(|rf| merge_field(lf, rf)))
            .collect();
        (!fields.is_empty()).then(|| ScoredToken::new(l.document_id, fields))
    })
}

/// `&`: documents matched by both sides.
pub fn intersect(left: &IntermediateQueryResult, right: &IntermediateQueryResult) -> IntermediateQueryResult {
    intersect_documents(left, right, |l, r| Some(l.merge(r)))
}

/// `|`: documents matched by either side.
pub fn union(left: &IntermediateQueryResult, right: &IntermediateQueryResult) -> IntermediateQueryResult {
    let (left, right) = (left.matches(), right.matches());
    let mut merged = Vec::with_capacity(left.len().max(right.len()));
    let (mut i, mut j) = (0, 0);

    while i < left.len() && j < right.len() {
        match left[i].document_id.cmp(&right[j].document_id) {
            Ordering::Less => {
                merged.push(left[i].clone());
                i += 1;
            }
            Ordering::Greater => {
                merged.push(right[j].clone());
                j += 1;
            }
            Ordering::Equal => {
                merged.push(left[i].merge(&right[j]));
                i += 1;
                j += 1;
            }
        }
    }

    merged.extend_from_slice(&left[i..]);
    merged.extend_from_slice(&right[j..]);
    IntermediateQueryResult::new(merged)
}

/// `&!`: left documents not matched by the right side.
pub fn except(left: &IntermediateQueryResult, right: &IntermediateQueryResult) -> IntermediateQueryResult {
    let right = right.matches();
    let mut j = 0;
    let mut kept = Vec::new();

    for document in left.matches() {
        while j < right.len() && right[j].document_id < document.document_id {
            j += 1;
        }
        if j == right.len() || right[j].document_id != document.document_id {
            kept.push(document.clone());
        }
    }

    IntermediateQueryResult::new(kept)
}

/// `>`: per field, keep the left locations that end before some right
/// location starts and the right locations that start after some left
/// location ends.
pub fn preceding_intersect(left: &IntermediateQueryResult, right: &IntermediateQueryResult) -> IntermediateQueryResult {
    intersect_fields(left, right, |lf, rf| {
        let latest_right_start = rf.locations.iter().map(TokenMatchLocation::min_token_index).max()?;
        let earliest_left_end = lf.locations.iter().map(TokenMatchLocation::max_token_index).min()?;

        let mut locations: Vec<TokenMatchLocation> = lf.locations
            .iter()
            .filter(|l| l.max_token_index() < latest_right_start)
            .cloned()
            .collect();
        if locations.is_empty() {
            return None;
        }
        locations.extend(
            rf.locations
                .iter()
                .filter(|r| r.min_token_index() > earliest_left_end)
                .cloned(),
        );

        Some(ScoredFieldMatch::new(lf.field_id, lf.score + rf.score, locations))
    })
}

/// `~n` and `~n>`: per field, every left/right location pair at most
/// `tolerance` tokens apart becomes one composite location. With
/// `preceding_only` the left location must come first.
pub fn composite_positional_intersect(
    left: &IntermediateQueryResult,
    right: &IntermediateQueryResult,
    tolerance: u32,
    preceding_only: bool,
) -> IntermediateQueryResult {
    let within = |first: &TokenMatchLocation, second: &TokenMatchLocation| {
        let (end, start) = (first.max_token_index(), second.min_token_index());
        start > end && start - end <= tolerance
    };

    intersect_fields(left, right, |lf, rf| {
        let mut locations = Vec::new();
        for l in &lf.locations {
            for r in &rf.locations {
                if within(l, r) || (!preceding_only && within(r, l)) {
                    locations.push(TokenMatchLocation::compose(l, r));
                }
            }
        }

        (!locations.is_empty()).then(|| ScoredFieldMatch::new(lf.field_id, lf.score + rf.score, locations))
    })
}

/// Combine two results the way `operator` requires.
pub fn merge(operator: BinaryOperator, left: &IntermediateQueryResult, right: &IntermediateQueryResult) -> IntermediateQueryResult {
    match operator {
        BinaryOperator::And => intersect(left, right),
        BinaryOperator::Or => union(left, right),
        BinaryOperator::AndNot => except(left, right),
        BinaryOperator::Preceding => preceding_intersect(left, right),
        BinaryOperator::Near(tolerance) => composite_positional_intersect(left, right, tolerance, false),
        BinaryOperator::PrecedingNear(tolerance) => composite_positional_intersect(left, right, tolerance, true),
    }
}
