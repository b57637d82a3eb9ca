//! Fact summary parsing and emission.
//!
//! A fact summary is the per-node text artifact a build step writes out,
//! listing what the node provides and depends on per kind. The format is a
//! small YAML subset: fixed kind keys mapping to flow lists, with member
//! entries as nested `[type, member]` pairs.
//!
//! ```text
//! provides-top-level: [a, b]
//! provides-member: [[Coll, reserve], [Coll, ""]]
//! depends-top-level: [c]
//! depends-external: [/usr/include/stdio.h]
//! ```
//!
//! Absent keys mean empty lists; entry order carries no meaning. Parsing is
//! strict: unknown keys, wrong pair arity, and scanner garbage are all
//! rejected so a truncated artifact never loads as a half-empty summary.

use std::fmt;

use serde::Deserialize;

use crate::graph::Fact;

/// Error for a fact summary that cannot be parsed.
///
/// Wraps the underlying YAML error; unknown kind keys and malformed member
/// pairs surface here as well.
#[derive(Debug, thiserror::Error)]
#[error("malformed fact summary: {0}")]
pub struct ParseError(#[from] serde_yaml::Error);

/// A node's declared facts, as read from (or written to) its summary file.
///
/// Member pairs keep their wire shape here: `(type, member)` with the empty
/// string as the any-member wildcard. Conversion to [`Fact`] happens in
/// [`provides_facts`](Self::provides_facts) and
/// [`depends_facts`](Self::depends_facts).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FactSummary {
    #[serde(rename = "provides-top-level")]
    pub provides_top_level: Vec<String>,
    #[serde(rename = "provides-nominal")]
    pub provides_nominal: Vec<String>,
    #[serde(rename = "provides-dynamic-lookup")]
    pub provides_dynamic_lookup: Vec<String>,
    #[serde(rename = "provides-member")]
    pub provides_member: Vec<(String, String)>,
    #[serde(rename = "depends-top-level")]
    pub depends_top_level: Vec<String>,
    #[serde(rename = "depends-nominal")]
    pub depends_nominal: Vec<String>,
    #[serde(rename = "depends-dynamic-lookup")]
    pub depends_dynamic_lookup: Vec<String>,
    #[serde(rename = "depends-member")]
    pub depends_member: Vec<(String, String)>,
    #[serde(rename = "depends-external")]
    pub depends_external: Vec<String>,
}

impl FactSummary {
    /// Parse a summary from its textual form.
    ///
    /// An empty (or comments-only) document is a valid, empty summary —
    /// a node may legitimately provide and depend on nothing.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        if is_blank(text) {
            return Ok(Self::default());
        }
        // A bare `---` document is null; map it to the empty summary too.
        let parsed: Option<FactSummary> = serde_yaml::from_str(text)?;
        Ok(parsed.unwrap_or_default())
    }

    /// The provided facts as graph values. Never contains external facts.
    pub fn provides_facts(&self) -> Vec<Fact> {
        let mut facts = Vec::new();
        facts.extend(self.provides_top_level.iter().cloned().map(Fact::TopLevel));
        facts.extend(self.provides_nominal.iter().cloned().map(Fact::Nominal));
        facts.extend(
            self.provides_dynamic_lookup
                .iter()
                .cloned()
                .map(Fact::DynamicLookup),
        );
        facts.extend(
            self.provides_member
                .iter()
                .map(|(t, m)| Fact::member(t.clone(), m.clone())),
        );
        facts
    }

    /// The depended-on facts as graph values, external paths included.
    pub fn depends_facts(&self) -> Vec<Fact> {
        let mut facts = Vec::new();
        facts.extend(self.depends_top_level.iter().cloned().map(Fact::TopLevel));
        facts.extend(self.depends_nominal.iter().cloned().map(Fact::Nominal));
        facts.extend(
            self.depends_dynamic_lookup
                .iter()
                .cloned()
                .map(Fact::DynamicLookup),
        );
        facts.extend(
            self.depends_member
                .iter()
                .map(|(t, m)| Fact::member(t.clone(), m.clone())),
        );
        facts.extend(self.depends_external.iter().cloned().map(Fact::External));
        facts
    }

    /// Build a summary from graph facts, the inverse of the accessors above.
    ///
    /// External facts in `provides` are skipped — the format cannot express
    /// providing a file.
    pub fn from_facts<'a, P, D>(provides: P, depends: D) -> Self
    where
        P: IntoIterator<Item = &'a Fact>,
        D: IntoIterator<Item = &'a Fact>,
    {
        let mut summary = Self::default();
        for fact in provides {
            match fact {
                Fact::TopLevel(name) => summary.provides_top_level.push(name.clone()),
                Fact::Nominal(name) => summary.provides_nominal.push(name.clone()),
                Fact::DynamicLookup(name) => summary.provides_dynamic_lookup.push(name.clone()),
                Fact::Member { type_name, member } => summary
                    .provides_member
                    .push((type_name.clone(), member.clone().unwrap_or_default())),
                Fact::External(_) => {}
            }
        }
        for fact in depends {
            match fact {
                Fact::TopLevel(name) => summary.depends_top_level.push(name.clone()),
                Fact::Nominal(name) => summary.depends_nominal.push(name.clone()),
                Fact::DynamicLookup(name) => summary.depends_dynamic_lookup.push(name.clone()),
                Fact::Member { type_name, member } => summary
                    .depends_member
                    .push((type_name.clone(), member.clone().unwrap_or_default())),
                Fact::External(path) => summary.depends_external.push(path.clone()),
            }
        }
        summary
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Emission: flow-style lists under each non-empty kind key, quoting only
/// scalars YAML would otherwise mangle. Round-trips through [`parse`].
///
/// [`parse`]: FactSummary::parse
impl fmt::Display for FactSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_names(f, "provides-top-level", &self.provides_top_level)?;
        write_names(f, "provides-nominal", &self.provides_nominal)?;
        write_names(f, "provides-dynamic-lookup", &self.provides_dynamic_lookup)?;
        write_pairs(f, "provides-member", &self.provides_member)?;
        write_names(f, "depends-top-level", &self.depends_top_level)?;
        write_names(f, "depends-nominal", &self.depends_nominal)?;
        write_names(f, "depends-dynamic-lookup", &self.depends_dynamic_lookup)?;
        write_pairs(f, "depends-member", &self.depends_member)?;
        write_names(f, "depends-external", &self.depends_external)
    }
}

fn is_blank(text: &str) -> bool {
    text.lines().all(|line| {
        let trimmed = line.trim();
        trimmed.is_empty() || trimmed.starts_with('#')
    })
}

fn write_names(f: &mut fmt::Formatter<'_>, key: &str, names: &[String]) -> fmt::Result {
    if names.is_empty() {
        return Ok(());
    }
    let list: Vec<String> = names.iter().map(|n| yaml_scalar(n)).collect();
    writeln!(f, "{key}: [{}]", list.join(", "))
}

fn write_pairs(f: &mut fmt::Formatter<'_>, key: &str, pairs: &[(String, String)]) -> fmt::Result {
    if pairs.is_empty() {
        return Ok(());
    }
    let list: Vec<String> = pairs
        .iter()
        .map(|(t, m)| format!("[{}, {}]", yaml_scalar(t), yaml_scalar(m)))
        .collect();
    writeln!(f, "{key}: [{}]", list.join(", "))
}

/// Render a scalar for a flow list, double-quoting when a bare spelling
/// would change meaning (flow punctuation, leading indicators, or scalars
/// YAML resolves to non-strings like `true` or `07`).
fn yaml_scalar(s: &str) -> String {
    if !needs_quotes(s) {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn needs_quotes(s: &str) -> bool {
    if s.is_empty() || resolves_non_string(s) {
        return true;
    }
    let first = s.chars().next().unwrap_or(' ');
    if first.is_whitespace() || "-?:,[]{}#&*!|>'\"%@`".contains(first) {
        return true;
    }
    if s.ends_with(char::is_whitespace) {
        return true;
    }
    s.chars().any(|c| ",[]{}:#\"\\\n".contains(c))
}

fn resolves_non_string(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "true" | "false" | "null" | "~" | "yes" | "no" | "on" | "off"
    ) || s.parse::<i64>().is_ok()
        || s.parse::<f64>().is_ok()
}
