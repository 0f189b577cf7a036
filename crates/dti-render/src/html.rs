// HTML rule listings and the index page
use crate::file_stem;
use dti_core::{Chain, Rule, Ruleset, Table, TargetCatalog, TargetKind};
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;

const STYLE: &str = "\
body { font-family: sans-serif; margin: 2em; }
table { border-collapse: collapse; }
th, td { border: 1px solid #ccc; padding: 0.3em 0.6em; text-align: left; vertical-align: top; }
td.num { text-align: right; font-family: monospace; }
td.cond, td.extra { font-family: monospace; }
.builtin { font-weight: bold; }
.unknown { color: #a00; }
";

fn page_start(out: &mut String, title: &str) {
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", text(title));
    let _ = writeln!(out, "<style>\n{}</style>", STYLE);
    out.push_str("</head>\n<body>\n");
}

fn page_end(out: &mut String) {
    out.push_str("</body>\n</html>\n");
}

/// Listing of one chain's rules in file order.
pub fn chain_page(
    table_name: &str,
    chain_name: &str,
    table: &Table,
    chain: &Chain,
    catalog: &TargetCatalog,
) -> String {
    let mut out = String::new();
    page_start(&mut out, &format!("{}: {}", table_name, chain_name));

    let _ = writeln!(
        out,
        "<p><a href=\"../index.html\">index</a> / {}</p>",
        text(table_name)
    );
    let _ = writeln!(out, "<h1>{}</h1>", text(chain_name));
    let _ = writeln!(
        out,
        "<p>Policy: <b>{}</b></p>",
        text(chain.policy().unwrap_or("none"))
    );

    let callers: Vec<&str> = table
        .chains()
        .filter(|(_, other)| other.has_target(chain_name))
        .map(|(name, _)| name)
        .collect();
    if !callers.is_empty() {
        out.push_str("<p>Called from: ");
        out.push_str(&chain_links(&callers));
        out.push_str("</p>\n");
    }
    let targets: Vec<&str> = chain.targets().collect();
    if !targets.is_empty() {
        out.push_str("<p>Jumps to: ");
        out.push_str(&chain_links(&targets));
        out.push_str("</p>\n");
    }

    if chain.rules().is_empty() {
        out.push_str("<p>(no rules)</p>\n");
    } else {
        out.push_str("<table>\n<tr><th>#</th><th>Packets</th><th>Bytes</th><th>Conditions</th><th>Target</th><th>Options</th></tr>\n");
        for (i, (rule, line)) in chain.rules_with_lines().enumerate() {
            let _ = writeln!(
                out,
                "<tr title=\"{}\"><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"cond\">{}</td><td>{}</td><td class=\"extra\">{}</td></tr>",
                attr(line),
                i + 1,
                counter(rule.packets()),
                counter(rule.bytes()),
                text(rule.conditions_str()),
                target_cell(rule, table, catalog),
                text(rule.extra_str()),
            );
        }
        out.push_str("</table>\n");
    }

    page_end(&mut out);
    out
}

/// Table of contents for every table and chain. `images` maps a table
/// name to its rasterized graph; only those tables get an image link.
pub fn index_page(
    ruleset: &Ruleset,
    catalog: &TargetCatalog,
    images: &BTreeMap<&str, &Path>,
) -> String {
    let mut out = String::new();
    page_start(&mut out, "iptables");
    out.push_str("<h1>Tables</h1>\n");

    if ruleset.is_empty() {
        out.push_str("<p>(no tables)</p>\n");
    }

    for (name, table) in ruleset.tables() {
        let stem = file_stem(name);
        let _ = writeln!(out, "<h2 id=\"{}\">{}</h2>", attr(&stem), text(name));
        let _ = write!(
            out,
            "<p><a href=\"{}.dot\">graph source</a>",
            attr(&stem)
        );
        let image = images
            .get(name)
            .and_then(|path| path.file_name())
            .and_then(|file| file.to_str());
        if let Some(file) = image {
            let _ = write!(out, " | <a href=\"{}\">graph</a>", attr(file));
        }
        out.push_str("</p>\n<ul>\n");
        for (chain_name, chain) in table.chains() {
            let _ = writeln!(
                out,
                "<li><a href=\"{}/{}.html\">{}</a> ({} rules, policy {})</li>",
                attr(&stem),
                attr(&file_stem(chain_name)),
                text(chain_name),
                chain.rules().len(),
                text(chain.policy().unwrap_or("none")),
            );
        }
        out.push_str("</ul>\n");
    }

    let builtins: Vec<String> = catalog
        .names()
        .map(|name| format!("<span class=\"builtin\">{}</span>", text(name)))
        .collect();
    out.push_str("<h2>Built-in targets</h2>\n");
    let _ = writeln!(out, "<p>{}</p>", builtins.join(", "));

    page_end(&mut out);
    out
}

fn counter(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn chain_links(names: &[&str]) -> String {
    names
        .iter()
        .map(|name| {
            format!(
                "<a href=\"{}.html\">{}</a>",
                attr(&file_stem(name)),
                text(name)
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn target_cell(rule: &Rule, table: &Table, catalog: &TargetCatalog) -> String {
    let verb = rule.verb.flag();
    match catalog.classify(table, &rule.target) {
        TargetKind::Chain => format!(
            "{} <a href=\"{}.html\">{}</a>",
            verb,
            attr(&file_stem(&rule.target)),
            text(&rule.target)
        ),
        TargetKind::Builtin => format!(
            "{} <span class=\"builtin\">{}</span>",
            verb,
            text(&rule.target)
        ),
        TargetKind::Unknown => format!(
            "{} <span class=\"unknown\">{}</span>",
            verb,
            text(&rule.target)
        ),
    }
}
