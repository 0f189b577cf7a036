use crate::file_stem;
use dti_core::{Chain, JumpVerb, Table, TargetCatalog, is_builtin_chain};
use std::fmt::Write;

/// Graphviz description of one table: a node per chain, an edge per
/// recorded jump between chains.
pub fn table_graph(table_name: &str, table: &Table, catalog: &TargetCatalog, rankdir: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph \"{}\" {{", escape(table_name));
    let _ = writeln!(out, "  rankdir={};", escape(rankdir));
    out.push_str("  node [shape=box, fontname=\"monospace\"];\n");

    let stem = file_stem(table_name);
    for (name, chain) in table.chains() {
        let style = if is_builtin_chain(name) { ", style=bold" } else { "" };
        let _ = writeln!(
            out,
            "  \"{}\" [label=\"{}\", URL=\"{}/{}.html\"{}];",
            escape(name),
            node_label(name, chain, catalog),
            escape(&stem),
            escape(&file_stem(name)),
            style,
        );
    }

    for (name, chain) in table.chains() {
        for target in chain.targets() {
            let style = if goto_only(chain, target) { " [style=dashed]" } else { "" };
            let _ = writeln!(out, "  \"{}\" -> \"{}\"{};", escape(name), escape(target), style);
        }
    }

    out.push_str("}\n");
    out
}

/// Chain name, policy, and the built-in actions its rules end in.
fn node_label(name: &str, chain: &Chain, catalog: &TargetCatalog) -> String {
    let mut lines = vec![escape(name)];
    if let Some(policy) = chain.policy() {
        lines.push(format!("policy: {}", escape(policy)));
    }

    let mut terminal: Vec<&str> = vec![];
    for rule in chain.rules() {
        let target = rule.target.as_str();
        if !chain.has_target(target) && catalog.is_builtin(target) && !terminal.contains(&target) {
            terminal.push(target);
        }
    }
    if !terminal.is_empty() {
        lines.push(escape(&terminal.join(", ")));
    }

    lines.join("\\n")
}

fn goto_only(chain: &Chain, target: &str) -> bool {
    chain
        .rules()
        .iter()
        .filter(|rule| rule.target == target)
        .all(|rule| rule.verb == JumpVerb::Goto)
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
