//! Canonical technical terms and surface-form synonym lookup
//!
//! The term table maps every known surface form (spelling, abbreviation and
//! locale variants) to one canonical term. It is loaded once into immutable
//! process-wide state; updating the vocabulary requires a restart, so query
//! serving never observes a half-updated dictionary.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::units::UnitFamily;

/// Category a canonical term belongs to. Entities (standard and generation
/// names) are what comparison queries contrast; parameters are what they
/// contrast them on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermCategory {
    /// A named standard or memory generation (DDR4, LPDDR5, ...)
    Entity,
    /// A numeric technical parameter (tCK, VDD, speed, ...)
    Parameter,
    /// A non-numeric feature term (ECC, XMP, form factors)
    Feature,
}

/// A normalized technical concept with its surface-form synonyms
#[derive(Debug, Clone)]
pub struct CanonicalTerm {
    /// Canonical name (e.g. "tCK")
    pub name: &'static str,
    /// Every accepted surface form, canonical name included
    pub synonyms: &'static [&'static str],
    pub category: TermCategory,
    /// Unit family of the term's values, if it is a numeric parameter
    pub family: Option<UnitFamily>,
    /// Unit every comparison row for this parameter is rendered in
    pub preferred_unit: Option<&'static str>,
    /// Short glossary definition
    pub definition: Option<&'static str>,
}

/// Seed vocabulary for JEDEC memory standards
static TERMS: &[CanonicalTerm] = &[
    // Memory standards (entities)
    CanonicalTerm { name: "DDR4", synonyms: &["ddr4", "ddr-4", "dimm4", "pc4", "pc-4"], category: TermCategory::Entity, family: None, preferred_unit: None, definition: None },
    CanonicalTerm { name: "DDR5", synonyms: &["ddr5", "ddr-5", "dimm5", "pc5", "pc-5"], category: TermCategory::Entity, family: None, preferred_unit: None, definition: None },
    CanonicalTerm { name: "LPDDR4", synonyms: &["lpddr4", "low-power ddr4", "lp4"], category: TermCategory::Entity, family: None, preferred_unit: None, definition: None },
    CanonicalTerm { name: "LPDDR5", synonyms: &["lpddr5", "low-power ddr5", "lp5"], category: TermCategory::Entity, family: None, preferred_unit: None, definition: None },
    // Timing parameters
    CanonicalTerm { name: "tCK", synonyms: &["tck", "clock cycle time", "cycle time", "clock period"], category: TermCategory::Parameter, family: Some(UnitFamily::Time), preferred_unit: Some("ns"), definition: Some("Clock cycle time, the minimum time between two consecutive clock edges") },
    CanonicalTerm { name: "tRAS", synonyms: &["tras", "row active time", "activate to precharge delay"], category: TermCategory::Parameter, family: Some(UnitFamily::Time), preferred_unit: Some("ns"), definition: Some("Row active time, the minimum time between row activate and precharge commands") },
    CanonicalTerm { name: "tRCD", synonyms: &["trcd", "row to column delay", "activate to read/write delay"], category: TermCategory::Parameter, family: Some(UnitFamily::Time), preferred_unit: Some("ns"), definition: Some("Row to column delay, the minimum time between activate and read/write commands") },
    CanonicalTerm { name: "tRP", synonyms: &["trp", "row precharge time", "precharge time"], category: TermCategory::Parameter, family: Some(UnitFamily::Time), preferred_unit: Some("ns"), definition: Some("Row precharge time, the minimum time between precharge and activate commands") },
    CanonicalTerm { name: "tRC", synonyms: &["trc", "row cycle time"], category: TermCategory::Parameter, family: Some(UnitFamily::Time), preferred_unit: Some("ns"), definition: Some("Row cycle time, the minimum time between activate commands to the same row") },
    CanonicalTerm { name: "CL", synonyms: &["cl", "cas", "cas latency", "column address strobe"], category: TermCategory::Parameter, family: Some(UnitFamily::Dimensionless), preferred_unit: None, definition: Some("CAS latency, the number of clock cycles between a read command and data availability") },
    // Voltage parameters
    CanonicalTerm { name: "VDD", synonyms: &["vdd", "supply voltage", "operating voltage"], category: TermCategory::Parameter, family: Some(UnitFamily::Voltage), preferred_unit: Some("V"), definition: Some("Supply voltage, the main operating voltage of the memory device") },
    CanonicalTerm { name: "VDDQ", synonyms: &["vddq", "i/o voltage", "dq voltage", "output voltage"], category: TermCategory::Parameter, family: Some(UnitFamily::Voltage), preferred_unit: Some("V"), definition: Some("I/O voltage, the voltage for data input/output signals") },
    CanonicalTerm { name: "VPP", synonyms: &["vpp", "programming voltage"], category: TermCategory::Parameter, family: Some(UnitFamily::Voltage), preferred_unit: Some("V"), definition: Some("Programming voltage used for wordline boost") },
    // Rate parameters
    CanonicalTerm { name: "speed", synonyms: &["speed", "data rate", "transfer rate"], category: TermCategory::Parameter, family: Some(UnitFamily::TransferRate), preferred_unit: Some("MT/s"), definition: None },
    CanonicalTerm { name: "frequency", synonyms: &["frequency", "clock speed", "clock frequency"], category: TermCategory::Parameter, family: Some(UnitFamily::Frequency), preferred_unit: Some("MHz"), definition: None },
    // Bandwidth has no canonical unit table; values are compared as bare
    // numbers rather than guessed into a family.
    CanonicalTerm { name: "bandwidth", synonyms: &["bandwidth", "throughput", "data bandwidth", "memory bandwidth"], category: TermCategory::Parameter, family: None, preferred_unit: None, definition: None },
    // Capacity
    CanonicalTerm { name: "capacity", synonyms: &["capacity", "size", "memory size", "storage capacity", "density"], category: TermCategory::Parameter, family: Some(UnitFamily::Capacity), preferred_unit: Some("GB"), definition: Some("Storage capacity of a module or die") },
    // Temperature conversions are affine (C/F/K), outside the exact
    // rational scale model, so temperature carries no unit family.
    CanonicalTerm { name: "temperature", synonyms: &["temperature", "temp", "thermal", "operating temperature"], category: TermCategory::Parameter, family: None, preferred_unit: None, definition: None },
    // Features and form factors
    CanonicalTerm { name: "ECC", synonyms: &["ecc", "error correction", "error correcting code"], category: TermCategory::Feature, family: None, preferred_unit: None, definition: Some("Error correcting code, detection and correction of memory errors") },
    CanonicalTerm { name: "XMP", synonyms: &["xmp", "extreme memory profile"], category: TermCategory::Feature, family: None, preferred_unit: None, definition: Some("Extreme Memory Profile, a vendor overclocking profile standard") },
    CanonicalTerm { name: "SODIMM", synonyms: &["sodimm", "so-dimm", "small outline dimm"], category: TermCategory::Feature, family: None, preferred_unit: None, definition: None },
    CanonicalTerm { name: "UDIMM", synonyms: &["udimm", "unbuffered dimm"], category: TermCategory::Feature, family: None, preferred_unit: None, definition: None },
    CanonicalTerm { name: "RDIMM", synonyms: &["rdimm", "registered dimm"], category: TermCategory::Feature, family: None, preferred_unit: None, definition: None },
    CanonicalTerm { name: "LRDIMM", synonyms: &["lrdimm", "load-reduced dimm", "load reduced dimm"], category: TermCategory::Feature, family: None, preferred_unit: None, definition: None },
];

/// Immutable canonical-term table keyed by normalized surface form
pub struct Dictionary {
    terms: &'static [CanonicalTerm],
    by_surface: HashMap<String, usize>,
}

static GLOBAL: Lazy<Dictionary> = Lazy::new(|| Dictionary::from_terms(TERMS));

impl Dictionary {
    /// Process-wide dictionary, built on first use
    pub fn global() -> &'static Dictionary {
        &GLOBAL
    }

    fn from_terms(terms: &'static [CanonicalTerm]) -> Self {
        let mut by_surface = HashMap::new();
        for (idx, term) in terms.iter().enumerate() {
            by_surface.insert(normalize_surface(term.name), idx);
            for synonym in term.synonyms {
                by_surface.insert(normalize_surface(synonym), idx);
            }
        }
        Self { terms, by_surface }
    }

    /// Resolve a surface form to its canonical term. Case-insensitive;
    /// strips periods and non-breaking spaces.
    pub fn canonicalize(&self, surface: &str) -> Option<&CanonicalTerm> {
        self.by_surface
            .get(&normalize_surface(surface))
            .map(|&idx| &self.terms[idx])
    }

    /// Glossary definition for a term, if one is recorded
    pub fn definition(&self, surface: &str) -> Option<&'static str> {
        self.canonicalize(surface).and_then(|t| t.definition)
    }

    /// Every canonical term mentioned in `text`, ordered by first
    /// appearance, deduplicated by canonical name.
    pub fn terms_in(&self, text: &str) -> Vec<&CanonicalTerm> {
        let lower = text.to_lowercase();
        let mut found: Vec<(usize, &CanonicalTerm)> = Vec::new();

        for term in self.terms {
            let mut earliest: Option<usize> = None;
            for synonym in term.synonyms {
                if let Some(pos) = find_word(&lower, &synonym.to_lowercase()) {
                    earliest = Some(earliest.map_or(pos, |e: usize| e.min(pos)));
                }
            }
            if let Some(pos) = earliest {
                if !found.iter().any(|(_, t)| t.name == term.name) {
                    found.push((pos, term));
                }
            }
        }

        found.sort_by_key(|(pos, _)| *pos);
        found.into_iter().map(|(_, t)| t).collect()
    }

    /// Entity mentions in `text` (standard/generation names only)
    pub fn entities_in(&self, text: &str) -> Vec<&CanonicalTerm> {
        self.terms_in(text)
            .into_iter()
            .filter(|t| t.category == TermCategory::Entity)
            .collect()
    }

    /// Parameter mentions in `text`
    pub fn parameters_in(&self, text: &str) -> Vec<&CanonicalTerm> {
        self.terms_in(text)
            .into_iter()
            .filter(|t| t.category == TermCategory::Parameter)
            .collect()
    }
}

/// Normalize a surface form for lookup: lowercase, strip periods, fold
/// non-breaking spaces, collapse runs of whitespace.
pub fn normalize_surface(surface: &str) -> String {
    let lowered = surface
        .to_lowercase()
        .replace('.', "")
        .replace('\u{00a0}', " ");
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Find `needle` in `haystack` at a word boundary (neither side adjacent to
/// an ASCII alphanumeric). Plain substring search would canonicalize "cl"
/// inside "clock". Only ASCII counts as a boundary breaker so Korean
/// particles glued to an entity name ("DDR4와") still match.
fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    let mut start = 0;
    while let Some(rel) = haystack[start..].find(needle) {
        let pos = start + rel;
        let end = pos + needle.len();
        let before_ok = pos == 0
            || !haystack[..pos]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_ascii_alphanumeric());
        let after_ok = end >= haystack.len()
            || !haystack[end..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphanumeric());
        if before_ok && after_ok {
            return Some(pos);
        }
        start = pos + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_is_case_insensitive() {
        let dict = Dictionary::global();
        assert_eq!(dict.canonicalize("TCK").unwrap().name, "tCK");
        assert_eq!(dict.canonicalize("Clock Cycle Time").unwrap().name, "tCK");
        assert_eq!(dict.canonicalize("ddr4").unwrap().name, "DDR4");
        assert!(dict.canonicalize("tXYZ").is_none());
    }

    #[test]
    fn canonicalize_strips_punctuation() {
        let dict = Dictionary::global();
        assert_eq!(dict.canonicalize("t.C.K.").unwrap().name, "tCK");
        assert_eq!(
            dict.canonicalize("clock\u{00a0}cycle time").unwrap().name,
            "tCK"
        );
    }

    #[test]
    fn terms_in_orders_by_appearance() {
        let dict = Dictionary::global();
        let terms = dict.terms_in("compare DDR5 and DDR4 tCK values");
        let names: Vec<_> = terms.iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["DDR5", "DDR4", "tCK"]);
    }

    #[test]
    fn word_boundaries_prevent_substring_hits() {
        let dict = Dictionary::global();
        // "clock" must not canonicalize to CL via the "cl" synonym
        let terms = dict.terms_in("the clock runs fast");
        assert!(terms.iter().all(|t| t.name != "CL"));
    }

    #[test]
    fn entity_and_parameter_filters() {
        let dict = Dictionary::global();
        let entities = dict.entities_in("DDR4 vs DDR5 tCK");
        assert_eq!(entities.len(), 2);
        let params = dict.parameters_in("DDR4 vs DDR5 tCK");
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "tCK");
    }

    #[test]
    fn capacity_bandwidth_and_form_factors_are_canonical() {
        let dict = Dictionary::global();
        assert_eq!(dict.canonicalize("bandwidth").unwrap().name, "bandwidth");
        assert_eq!(dict.canonicalize("throughput").unwrap().name, "bandwidth");
        let capacity = dict.canonicalize("density").unwrap();
        assert_eq!(capacity.name, "capacity");
        assert_eq!(capacity.preferred_unit, Some("GB"));
        assert_eq!(dict.canonicalize("temperature").unwrap().name, "temperature");
        assert_eq!(dict.canonicalize("load-reduced dimm").unwrap().name, "LRDIMM");
    }

    #[test]
    fn definitions_come_from_glossary() {
        let dict = Dictionary::global();
        assert!(dict.definition("tck").unwrap().contains("clock"));
        assert!(dict.definition("ddr4").is_none());
    }
}
