//! Ordered country-name canonicalization rules.
//!
//! Each rule is a regex tested against the raw country text. The first rule
//! that matches replaces the whole field with its canonical name and
//! evaluation stops there. A name no rule matches is its own canonical name.

use crate::error::{PipelineError, Result, ResultExt};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Built-in rules, most specific first.
///
/// `Dominican Republic` has to precede `Dominica`, which would otherwise
/// swallow it.
const BUILTIN_RULE_TABLE: &[(&str, &str)] = &[
    (r"^.*Azerbaijan.*$", "Azerbaijan"),
    (r"^.*China.*$", "China"),
    (r"^.*Korea.*$", "South Korea"),
    (r"^.*Iran.*$", "Iran"),
    (r"^.*Hong Kong.*$", "Hong Kong"),
    (r"^.*Bahamas.*$", "Bahamas"),
    (r"^.*Czechia.*$", "Czech Republic"),
    (r"^.*Dominican Republic.*$", "Dominican Republic"),
    (r"^.*Dominica.*$", "Dominica"),
    (r"^.*Gambia.*$", "Gambia"),
    (r"^.*Maca.*$", "Macao"),
    (r"^.*Ireland.*$", "Ireland"),
    (r"^.*Moldova.*$", "Moldova"),
    (r"^.*Congo.*$", "Congo"),
    (r"^.*Russia.*$", "Russia"),
    (r"^.*Taiwan.*$", "Taiwan"),
    (r"^.*UK.*$", "United Kingdom"),
    (r"^.*US.*$", "United States"),
    (r"^.*Viet Nam.*$", "Vietnam"),
    (r"^.*Palesti.*$", "State of Palestine"),
    (r"^.*Gaza.*$", "State of Palestine"),
    (r"^.*Ivory.*$", "Cote d'Ivoire"),
    (r"^.*VietNam.*$", "Vietnam"),
    (r"^.*Burma.*$", "Myanmar"),
    (r"^.*St\. Martin.*$", "Saint Martin"),
    (r"^.*Verde.*$", "Cape Verde"),
    (r"^.*Timor-Leste.*$", "East Timor"),
    (r"^.*Jersey.*$", "United Kingdom"),
    (r"^.*Guernsey.*$", "United Kingdom"),
    (r"^.*Channel Islands.*$", "United Kingdom"),
    (r"^.*Vatican City.*$", "Holy See"),
];

static BUILTIN_RULES: Lazy<Vec<CanonicalRule>> = Lazy::new(|| {
    BUILTIN_RULE_TABLE
        .iter()
        .map(|(pattern, canonical)| CanonicalRule {
            pattern: Regex::new(pattern).expect("Invalid regex: built-in country rule"),
            canonical: (*canonical).to_string(),
        })
        .collect()
});

/// Serialized form of a rule, as stored in a rules file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub pattern: String,
    pub canonical: String,
}

/// A compiled (pattern, canonical-name) pair.
#[derive(Debug, Clone)]
pub struct CanonicalRule {
    pattern: Regex,
    canonical: String,
}

impl CanonicalRule {
    pub fn new(pattern: &str, canonical: impl Into<String>) -> Result<Self> {
        let compiled = Regex::new(pattern).map_err(|e| PipelineError::InvalidRule {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            pattern: compiled,
            canonical: canonical.into(),
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.pattern.is_match(name)
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

/// Outcome of resolving one raw name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// A rule matched; holds its canonical name.
    Mapped(&'a str),
    /// No rule matched; holds the raw name.
    Unmapped(&'a str),
}

impl<'a> Resolution<'a> {
    pub fn name(&self) -> &'a str {
        match *self {
            Self::Mapped(name) | Self::Unmapped(name) => name,
        }
    }
}

/// Resolves raw country names against an ordered rule list.
#[derive(Debug, Clone)]
pub struct CountryResolver {
    rules: Vec<CanonicalRule>,
}

impl Default for CountryResolver {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CountryResolver {
    pub fn new(rules: Vec<CanonicalRule>) -> Self {
        Self { rules }
    }

    /// The rule table reconciling the known upstream spellings.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_RULES.clone())
    }

    pub fn from_specs(specs: &[RuleSpec]) -> Result<Self> {
        let rules = specs
            .iter()
            .map(|spec| CanonicalRule::new(&spec.pattern, spec.canonical.clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(rules))
    }

    /// Load an ordered JSON array of [`RuleSpec`]s.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Reading rules file '{}'", path.display()))?;
        let specs: Vec<RuleSpec> = serde_json::from_str(&content)?;
        Self::from_specs(&specs).context(format!("Compiling rules from '{}'", path.display()))
    }

    pub fn rules(&self) -> &[CanonicalRule] {
        &self.rules
    }

    /// First matching rule wins; later rules are never consulted.
    pub fn resolve<'a>(&'a self, name: &'a str) -> Resolution<'a> {
        self.rules
            .iter()
            .find(|rule| rule.matches(name))
            .map(|rule| Resolution::Mapped(rule.canonical()))
            .unwrap_or(Resolution::Unmapped(name))
    }
}
