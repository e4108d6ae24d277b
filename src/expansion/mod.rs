//! Query expansion: synonym, unit, and paraphrase variants
//!
//! The original query always leads the variant list. Deterministic rewrites
//! (synonym substitution and unit conversion) come next; LLM paraphrases are
//! appended last and a paraphrase failure degrades silently to the
//! deterministic variants. Entity mentions are never rewritten away: a
//! variant that loses an entity the original named is discarded.

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::ExpansionConfig;
use crate::dictionary::{
    bridge_transfer_rate, convert, find_values, unit_spellings, units_in_family, Dictionary,
    TermCategory, UnitValue,
};
use crate::error::Error;
use crate::generation::PromptBuilder;
use crate::providers::LlmProvider;
use crate::retrieval::RetryPolicy;
use crate::types::ExpandedQuery;

/// Produces retrieval variants for a query
pub struct QueryExpander {
    config: ExpansionConfig,
    llm: Option<Arc<dyn LlmProvider>>,
    retry: RetryPolicy,
    llm_timeout: Duration,
}

impl QueryExpander {
    pub fn new(config: ExpansionConfig) -> Self {
        Self {
            config,
            llm: None,
            retry: RetryPolicy::new(1, Duration::ZERO, Duration::ZERO, 0.0),
            llm_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_llm(
        config: ExpansionConfig,
        llm: Arc<dyn LlmProvider>,
        retry: RetryPolicy,
        llm_timeout: Duration,
    ) -> Self {
        Self {
            config,
            llm: Some(llm),
            retry,
            llm_timeout,
        }
    }

    /// Expand a query into its retrieval variants
    pub async fn expand(&self, query: &str) -> ExpandedQuery {
        let mut expanded = self.expand_deterministic(query);

        if let Some(llm) = &self.llm {
            match self.paraphrase(llm.as_ref(), query).await {
                Ok(paraphrases) => {
                    for p in paraphrases {
                        expanded.push(p);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "paraphrase generation failed, keeping deterministic variants");
                }
            }
        }

        expanded.truncate(self.config.max_variants);
        debug!(original = query, variants = expanded.len(), "expanded query");
        expanded
    }

    /// Synonym and unit rewrites only; no LLM involved
    pub fn expand_deterministic(&self, query: &str) -> ExpandedQuery {
        let mut expanded = ExpandedQuery::new(query);
        self.push_synonym_variants(query, &mut expanded);
        self.push_unit_variants(query, &mut expanded);
        expanded
    }

    /// Substitute parameter and feature synonyms. Entity names stay put so
    /// no variant drifts to a different standard.
    fn push_synonym_variants(&self, query: &str, expanded: &mut ExpandedQuery) {
        let dict = Dictionary::global();
        for term in dict.terms_in(query) {
            if term.category == TermCategory::Entity {
                continue;
            }
            let Some((pattern, _)) = matched_surface(query, term.synonyms) else {
                continue;
            };
            let mut alternatives: Vec<&str> = vec![term.name];
            alternatives.extend(term.synonyms.iter().copied());
            for alt in alternatives {
                let variant = pattern.replace(query, alt).into_owned();
                if variant != query {
                    expanded.push(variant);
                }
            }
        }
    }

    /// Rewrite each parsed value into the other units of its family, plus
    /// the DDR clock/transfer-rate bridge in both directions. Spelled-out
    /// unit names are also rewritten to their symbols even with no
    /// magnitude attached ("in picoseconds" to "in ps").
    fn push_unit_variants(&self, query: &str, expanded: &mut ExpandedQuery) {
        for (alias, symbol) in unit_spellings() {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(alias));
            if let Ok(re) = Regex::new(&pattern) {
                if re.is_match(query) {
                    expanded.push(re.replace_all(query, symbol).into_owned());
                }
            }
        }
        for (range, value) in find_values(query) {
            for unit in units_in_family(value.family) {
                if unit == value.unit {
                    continue;
                }
                if let Ok(converted) = convert(&value, unit) {
                    expanded.push(splice(query, &range, &converted));
                }
            }
            if let Some(bridged) = bridge_transfer_rate(&value, self.config.ddr_transfer_multiplier)
            {
                expanded.push(splice(query, &range, &bridged));
            }
        }
    }

    async fn paraphrase(&self, llm: &dyn LlmProvider, query: &str) -> crate::error::Result<Vec<String>> {
        let prompt = PromptBuilder::paraphrase_prompt(query, self.config.max_paraphrases);
        let raw = self
            .retry
            .run(|| async {
                timeout(self.llm_timeout, llm.generate(&prompt))
                    .await
                    .map_err(|_| Error::llm("paraphrase generation timed out"))?
            })
            .await?;
        let dict = Dictionary::global();
        let required: Vec<&str> = dict
            .entities_in(query)
            .into_iter()
            .map(|t| t.name)
            .collect();

        let paraphrases = PromptBuilder::parse_paraphrases(&raw, self.config.max_paraphrases)
            .into_iter()
            .filter(|p| {
                // Entity mentions must survive the rewrite
                let mentioned: Vec<&str> =
                    dict.entities_in(p).into_iter().map(|t| t.name).collect();
                required.iter().all(|e| mentioned.contains(e))
            })
            .collect();
        Ok(paraphrases)
    }
}

/// Which synonym surface actually occurs in the query, as a boundary-anchored
/// case-insensitive pattern
fn matched_surface(query: &str, synonyms: &[&str]) -> Option<(Regex, String)> {
    // Longest surfaces first so "clock cycle time" wins over "cycle time"
    let mut sorted: Vec<&str> = synonyms.to_vec();
    sorted.sort_by_key(|s| std::cmp::Reverse(s.len()));
    for surface in sorted {
        let pattern = format!(r"(?i)\b{}\b", regex::escape(surface));
        if let Ok(re) = Regex::new(&pattern) {
            if re.is_match(query) {
                return Some((re, surface.to_string()));
            }
        }
    }
    None
}

fn splice(query: &str, range: &std::ops::Range<usize>, value: &UnitValue) -> String {
    format!("{}{}{}", &query[..range.start], value, &query[range.end..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    fn expander() -> QueryExpander {
        QueryExpander::new(ExpansionConfig::default())
    }

    /// Fails the first call, then answers with one paraphrase line
    struct FlakyLlm {
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmProvider for FlakyLlm {
        async fn generate(&self, _prompt: &str) -> crate::error::Result<String> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(Error::llm("overloaded"))
            } else {
                Ok("- What is the tCK of DDR4?".to_string())
            }
        }
        async fn health_check(&self) -> crate::error::Result<bool> {
            Ok(true)
        }
        fn name(&self) -> &str {
            "flaky"
        }
        fn model(&self) -> &str {
            "flaky-1"
        }
    }

    #[test]
    fn original_is_always_first() {
        let expanded = expander().expand_deterministic("What is the tCK of DDR4?");
        assert_eq!(expanded.variants[0], "What is the tCK of DDR4?");
    }

    #[test]
    fn synonym_variants_cover_parameter_spellings() {
        let expanded = expander().expand_deterministic("What is the tCK of DDR4?");
        assert!(expanded
            .variants
            .iter()
            .any(|v| v.contains("clock cycle time")));
        // Entity names are never substituted
        assert!(expanded.variants.iter().all(|v| v.contains("DDR4")));
    }

    #[test]
    fn unit_variants_stay_in_family() {
        let expanded = expander().expand_deterministic("tCK of 0.75 ns for DDR4");
        assert!(expanded.variants.iter().any(|v| v.contains("750 ps")));
        // No voltage rendering of a time value
        assert!(expanded.variants.iter().all(|v| !v.contains("mV")));
    }

    #[test]
    fn picosecond_variant_for_nanosecond_query() {
        let expanded = expander().expand_deterministic("parts with tCK below 0.5 ns");
        assert!(expanded.variants.iter().any(|v| v.contains("500 ps")));
    }

    #[test]
    fn spelled_out_units_are_rewritten_to_symbols() {
        let expanded = expander().expand_deterministic("tCK in picoseconds");
        assert_eq!(expanded.variants[0], "tCK in picoseconds");
        assert!(expanded.variants.iter().any(|v| v.contains("in ps")));
        assert!(expanded.variants.iter().any(|v| v.contains("tCK")));
    }

    #[test]
    fn ddr_bridge_adds_transfer_rate_variant() {
        let expanded = expander().expand_deterministic("DDR4 at 1600 MHz");
        assert!(expanded.variants.iter().any(|v| v.contains("3200 MT/s")));
    }

    #[test]
    fn bridge_works_in_reverse() {
        let expanded = expander().expand_deterministic("DDR5 at 4800 MT/s");
        assert!(expanded.variants.iter().any(|v| v.contains("2400 MHz")));
    }

    #[test]
    fn variant_cap_is_honored() {
        let mut config = ExpansionConfig::default();
        config.max_variants = 3;
        let expander = QueryExpander::new(config);
        let expanded = expander.expand_deterministic("tCK tRAS tRCD tRP of 0.75 ns 32 ns");
        // Cap applies after deterministic expansion in expand(); here we only
        // check the builder does not dedup away the original
        assert_eq!(expanded.variants[0], "tCK tRAS tRCD tRP of 0.75 ns 32 ns");
    }

    #[test]
    fn no_variants_without_known_terms_or_units() {
        let expanded = expander().expand_deterministic("what is a memory module");
        assert_eq!(expanded.variants.len(), 1);
    }

    #[tokio::test]
    async fn paraphrase_calls_are_retried_on_transient_failure() {
        let llm = Arc::new(FlakyLlm {
            calls: AtomicU32::new(0),
        });
        let expander = QueryExpander::with_llm(
            ExpansionConfig::default(),
            Arc::clone(&llm) as Arc<dyn LlmProvider>,
            RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5), 0.0),
            Duration::from_secs(5),
        );

        let expanded = expander.expand("DDR4 tCK").await;
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
        assert!(expanded
            .variants
            .iter()
            .any(|v| v == "What is the tCK of DDR4?"));
    }

    #[tokio::test]
    async fn expand_without_llm_is_deterministic_only() {
        let expanded = expander().expand("tCK of DDR4").await;
        assert_eq!(expanded.variants[0], "tCK of DDR4");
        assert!(expanded.len() <= ExpansionConfig::default().max_variants);
    }
}
