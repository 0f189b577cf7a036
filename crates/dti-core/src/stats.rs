use crate::model::Ruleset;
use crate::targets::{TargetCatalog, TargetKind};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RulesetStats {
    pub tables: Vec<TableStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableStats {
    pub name: String,
    pub chains: usize,
    pub rules: usize,
    pub edges: usize,
    /// Rules whose target is neither a chain of the table nor a built-in.
    /// Forward references to chains declared later are not counted here,
    /// even though they produce no edge.
    pub unresolved: usize,
}

impl RulesetStats {
    pub fn collect(ruleset: &Ruleset, catalog: &TargetCatalog) -> Self {
        let tables = ruleset
            .tables()
            .map(|(name, table)| {
                let unresolved = table
                    .chains()
                    .flat_map(|(_, chain)| chain.rules())
                    .filter(|rule| catalog.classify(table, &rule.target) == TargetKind::Unknown)
                    .count();

                TableStats {
                    name: name.to_string(),
                    chains: table.len(),
                    rules: table.rule_count(),
                    edges: table.edge_count(),
                    unresolved,
                }
            })
            .collect();

        Self { tables }
    }

    pub fn total_rules(&self) -> usize {
        self.tables.iter().map(|t| t.rules).sum()
    }

    pub fn display(&self) {
        println!("📊 Ruleset ({} tables, {} rules):", self.tables.len(), self.total_rules());
        if self.tables.is_empty() {
            println!("  (none)");
            return;
        }

        for table in &self.tables {
            println!(
                "  • {} - {} chains, {} rules, {} jumps",
                table.name, table.chains, table.rules, table.edges
            );
            if table.unresolved > 0 {
                println!("    Unresolved targets: {}", table.unresolved);
            }
        }
    }
}
