// In-memory model of an iptables-save dump
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// All tables from one parse, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ruleset {
    pub(crate) tables: IndexMap<String, Table>,
}

/// Chains of one table, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub(crate) chains: IndexMap<String, Chain>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    pub(crate) policy: Option<String>,
    pub(crate) rules: Vec<Rule>,
    /// Raw rule lines, parallel to `rules`
    pub(crate) lines: Vec<String>,
    /// Chains of the same table that rules in this chain jump to
    pub(crate) targets: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub counters: Option<Counters>,
    pub chain: String,
    pub conditions: Option<String>,
    pub verb: JumpVerb,
    pub target: String,
    pub extra: Option<String>,
}

/// The `[packets:bytes]` prefix of a rule line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub packets: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JumpVerb {
    /// `-j`: continue in the caller after the target returns
    Jump,
    /// `-g`: hand over without returning
    Goto,
}

impl JumpVerb {
    pub fn flag(&self) -> &'static str {
        match self {
            Self::Jump => "-j",
            Self::Goto => "-g",
        }
    }
}

impl fmt::Display for JumpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag())
    }
}

impl Ruleset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.tables.iter().map(|(name, table)| (name.as_str(), table))
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Insert an empty table, replacing any previous table of that name.
    /// Returns the table's position, which is stable across replacement.
    pub(crate) fn insert_table(&mut self, name: &str) -> usize {
        self.tables.insert_full(name.to_string(), Table::default()).0
    }
}

impl Table {
    pub fn chain(&self, name: &str) -> Option<&Chain> {
        self.chains.get(name)
    }

    pub fn chains(&self) -> impl Iterator<Item = (&str, &Chain)> {
        self.chains.iter().map(|(name, chain)| (name.as_str(), chain))
    }

    pub fn contains_chain(&self, name: &str) -> bool {
        self.chains.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn rule_count(&self) -> usize {
        self.chains.values().map(|c| c.rules.len()).sum()
    }

    pub fn edge_count(&self) -> usize {
        self.chains.values().map(|c| c.targets.len()).sum()
    }

    pub(crate) fn insert_chain(&mut self, name: &str, policy: Option<String>) {
        self.chains.insert(
            name.to_string(),
            Chain {
                policy,
                ..Chain::default()
            },
        );
    }
}

impl Chain {
    /// Default policy; `None` for user-defined chains (`-` in the dump).
    pub fn policy(&self) -> Option<&str> {
        self.policy.as_deref()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rules paired with the raw line each was parsed from.
    pub fn rules_with_lines(&self) -> impl Iterator<Item = (&Rule, &str)> {
        self.rules
            .iter()
            .zip(self.lines.iter().map(String::as_str))
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(String::as_str)
    }

    pub fn has_target(&self, chain: &str) -> bool {
        self.targets.contains(chain)
    }

    pub(crate) fn push_rule(&mut self, rule: Rule, line: &str) {
        self.rules.push(rule);
        self.lines.push(line.to_string());
    }
}

impl Rule {
    pub fn packets(&self) -> Option<u64> {
        self.counters.map(|c| c.packets)
    }

    pub fn bytes(&self) -> Option<u64> {
        self.counters.map(|c| c.bytes)
    }

    /// Match conditions, empty when the rule has none.
    pub fn conditions_str(&self) -> &str {
        self.conditions.as_deref().unwrap_or_default()
    }

    /// Trailing target options, empty when the rule has none.
    pub fn extra_str(&self) -> &str {
        self.extra.as_deref().unwrap_or_default()
    }
}
