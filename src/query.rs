// src/query.rs
//! Query builder: composes the single search-query string from the selected
//! industry facet, company-size facet, and optional free-text location.
//!
//! The expansion tables are immutable and loaded once at process start; the
//! builder itself is deterministic and side-effect-free.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::candidate::CompanySize;

/// Industry label -> OR-expansion terms. BTreeMap keeps facet listings in a
/// stable order.
static INDUSTRY_TERMS: Lazy<BTreeMap<String, String>> = Lazy::new(|| {
    let raw = include_str!("../industry_terms.json");
    serde_json::from_str::<BTreeMap<String, String>>(raw).expect("valid industry terms table")
});

/// Fixed tail appended to every discovery query.
const CAREER_TERMS: &str = "(careers OR jobs OR hiring OR employment)";

/// OR-expansion for the company-size facet.
pub fn size_terms(size: CompanySize) -> &'static str {
    match size {
        CompanySize::LargeCorporation => "fortune 500 OR enterprise OR corporation OR multinational",
        CompanySize::Startup => "startup OR scaleup OR emerging OR growing company",
    }
}

/// The fixed set of industry labels, in listing order.
pub fn known_industries() -> Vec<&'static str> {
    INDUSTRY_TERMS.keys().map(|k| k.as_str()).collect()
}

/// Builds the discovery query:
/// `(industry terms) (size terms) [location:<location>] (careers OR jobs OR hiring OR employment)`.
///
/// Unrecognized industry labels fall back to the raw label; an empty (or
/// whitespace-only) location omits the location clause entirely.
pub fn build_discovery_query(industry: &str, company_size: CompanySize, location: &str) -> String {
    let industry_terms = INDUSTRY_TERMS
        .get(industry)
        .map(String::as_str)
        .unwrap_or(industry);

    let mut query = format!("({industry_terms}) ({})", size_terms(company_size));
    let loc = location.trim();
    if !loc.is_empty() {
        query.push_str(" location:");
        query.push_str(loc);
    }
    query.push(' ');
    query.push_str(CAREER_TERMS);
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn technology_startup_without_location() {
        let q = build_discovery_query("Technology & Software", CompanySize::Startup, "");
        assert!(q.contains("technology OR software OR tech"), "q = {q}");
        assert!(q.contains("startup OR scaleup OR emerging"), "q = {q}");
        assert!(q.ends_with("(careers OR jobs OR hiring OR employment)"), "q = {q}");
        assert!(!q.contains("location:"), "q = {q}");
    }

    #[test]
    fn location_clause_present_when_given() {
        let q = build_discovery_query(
            "Finance & Banking",
            CompanySize::LargeCorporation,
            "  Boston ",
        );
        assert!(q.contains(" location:Boston "), "q = {q}");
        assert!(q.contains("fortune 500 OR enterprise"), "q = {q}");
    }

    #[test]
    fn unrecognized_industry_falls_back_to_raw_label() {
        let q = build_discovery_query("Basket Weaving", CompanySize::Startup, "");
        assert!(q.starts_with("(Basket Weaving) "), "q = {q}");
    }

    #[test]
    fn builder_is_deterministic() {
        let a = build_discovery_query("Healthcare & Biotech", CompanySize::Startup, "Prague");
        let b = build_discovery_query("Healthcare & Biotech", CompanySize::Startup, "Prague");
        assert_eq!(a, b);
    }

    #[test]
    fn industry_table_is_nonempty_and_sorted() {
        let labels = known_industries();
        assert!(labels.contains(&"Technology & Software"));
        let mut sorted = labels.clone();
        sorted.sort();
        assert_eq!(labels, sorted);
    }
}
