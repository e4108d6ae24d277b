//! Comparison intent detection
//!
//! A query is a comparison only when a marker phrase co-occurs with at
//! least two distinct entity mentions. Entity order in the request follows
//! query appearance order and becomes the column order of the result.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::dictionary::Dictionary;
use crate::types::{ComparisonRequest, ParameterSet};

/// Marker phrases, English and Korean
static MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(vs\.?|versus|compare[ds]?|comparing|comparison|difference[s]? between)\b|비교|차이",
    )
    .expect("marker regex")
});

/// Detect comparison intent. Returns `None` for single-entity or
/// marker-free queries; those follow the direct answer path.
pub fn detect(query: &str) -> Option<ComparisonRequest> {
    if !MARKER_RE.is_match(query) {
        return None;
    }

    let dict = Dictionary::global();
    let entities: Vec<String> = dict
        .entities_in(query)
        .into_iter()
        .map(|t| t.name.to_string())
        .collect();
    if entities.len() < 2 {
        return None;
    }

    let parameters: Vec<String> = dict
        .parameters_in(query)
        .into_iter()
        .map(|t| t.name.to_string())
        .collect();

    let parameters = if parameters.is_empty() {
        ParameterSet::Inferred
    } else {
        ParameterSet::Explicit(parameters)
    };

    Some(ComparisonRequest {
        entities,
        parameters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_vs_with_two_entities() {
        let request = detect("DDR4 vs DDR5 tCK").unwrap();
        assert_eq!(request.entities, vec!["DDR4", "DDR5"]);
        assert_eq!(
            request.parameters,
            ParameterSet::Explicit(vec!["tCK".to_string()])
        );
    }

    #[test]
    fn entity_order_follows_the_query() {
        let request = detect("compare LPDDR5 and DDR4").unwrap();
        assert_eq!(request.entities, vec!["LPDDR5", "DDR4"]);
    }

    #[test]
    fn no_parameters_means_inferred() {
        let request = detect("what is the difference between DDR4 and DDR5").unwrap();
        assert_eq!(request.parameters, ParameterSet::Inferred);
    }

    #[test]
    fn single_entity_is_not_a_comparison() {
        assert!(detect("compare DDR5 speed bins").is_none());
    }

    #[test]
    fn marker_free_query_is_not_a_comparison() {
        assert!(detect("DDR4 and DDR5 tCK values").is_none());
    }

    #[test]
    fn korean_markers_are_detected() {
        assert!(detect("DDR4 DDR5 비교").is_some());
        assert!(detect("DDR4와 DDR5의 차이").is_some());
    }

    #[test]
    fn versus_spellings() {
        assert!(detect("DDR4 versus DDR5").is_some());
        assert!(detect("DDR4 vs. DDR5").is_some());
    }
}
