use crate::classifier::{LineKind, RuleLine, classify};
use crate::diagnostics::{LineContext, ParseError, ParseIssue};
use crate::model::{Rule, Ruleset, Table};
use std::borrow::Cow;
use std::io::BufRead;
use tracing::{debug, trace, warn};

/// Result of a parse: the ruleset plus every non-fatal issue, in line order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    pub ruleset: Ruleset,
    pub issues: Vec<ParseIssue>,
}

impl ParseOutcome {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Sequential iptables-save parser.
///
/// Lines are fed one at a time; there is no lookahead. The table that
/// chain and rule lines attach to is tracked here, outside the ruleset,
/// so the finished [`Ruleset`] carries no parsing state.
#[derive(Debug, Default)]
pub struct Parser {
    ruleset: Ruleset,
    issues: Vec<ParseIssue>,
    /// Position of the current table in `ruleset`
    current: Option<usize>,
    line_no: usize,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one raw input line.
    pub fn feed(&mut self, raw: &str) {
        self.line_no += 1;
        let line = raw.trim();
        if line.is_empty() {
            trace!(line_no = self.line_no, "skipping blank line");
            return;
        }

        match classify(line) {
            LineKind::Table { name } => self.on_table(name),
            LineKind::Chain { name, policy, .. } => self.on_chain(name, policy, line),
            LineKind::Rule(rule) => self.on_rule(rule, line),
            LineKind::Commit => self.current = None,
            LineKind::Comment { .. } => {}
            LineKind::Unrecognized => self.report(ParseIssue::Unrecognized {
                line_no: self.line_no,
                line: line.to_string(),
            }),
        }
    }

    pub fn finish(self) -> ParseOutcome {
        debug!(
            tables = self.ruleset.len(),
            issues = self.issues.len(),
            "parse finished"
        );
        ParseOutcome {
            ruleset: self.ruleset,
            issues: self.issues,
        }
    }

    fn on_table(&mut self, name: &str) {
        debug!(table = name, "table declared");
        self.current = Some(self.ruleset.insert_table(name));
    }

    fn on_chain(&mut self, name: &str, policy: &str, line: &str) {
        let Some(table) = self.current_table() else {
            return self.report(ParseIssue::NoCurrentTable {
                line_no: self.line_no,
                context: LineContext::Chain,
                line: line.to_string(),
            });
        };

        let policy = (policy != "-").then(|| policy.to_string());
        table.insert_chain(name, policy);
    }

    fn on_rule(&mut self, rule: RuleLine<'_>, line: &str) {
        let line_no = self.line_no;
        let Some(idx) = self.current else {
            return self.report(ParseIssue::NoCurrentTable {
                line_no,
                context: LineContext::Rule,
                line: line.to_string(),
            });
        };
        let Some((table_name, table)) = self.ruleset.tables.get_index_mut(idx) else {
            return;
        };

        // Edges only point at chains that exist when the rule is read.
        let is_edge = table.contains_chain(rule.target);

        let Some(chain) = table.chains.get_mut(rule.chain) else {
            let issue = ParseIssue::UnknownChain {
                line_no,
                table: table_name.clone(),
                chain: rule.chain.to_string(),
                line: line.to_string(),
            };
            return self.report(issue);
        };

        if is_edge {
            chain.targets.insert(rule.target.to_string());
        }
        chain.push_rule(
            Rule {
                counters: rule.counters,
                chain: rule.chain.to_string(),
                conditions: rule.conditions.map(str::to_string),
                verb: rule.verb,
                target: rule.target.to_string(),
                extra: rule.extra.map(str::to_string),
            },
            line,
        );
    }

    fn current_table(&mut self) -> Option<&mut Table> {
        let idx = self.current?;
        self.ruleset.tables.get_index_mut(idx).map(|(_, table)| table)
    }

    fn report(&mut self, issue: ParseIssue) {
        if issue.is_context_error() {
            warn!(line_no = issue.line_no(), "misplaced line: {}", issue);
        } else {
            warn!(line_no = issue.line_no(), "unrecognized line: {}", issue.line());
        }
        self.issues.push(issue);
    }
}

/// Parse an iptables-save dump held in memory.
pub fn parse_str(input: &str) -> ParseOutcome {
    parse_lines(input.lines())
}

pub fn parse_lines<I, S>(lines: I) -> ParseOutcome
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = Parser::new();
    for line in lines {
        parser.feed(line.as_ref());
    }
    parser.finish()
}

/// Parse from a blocking reader such as a file or stdin. Only read
/// failures are errors; malformed lines end up in the outcome's issues.
///
/// Lines are decoded lossily: comment strings can carry bytes that are
/// not UTF-8, and those must not cost the rest of the dump.
pub fn parse_reader<R: BufRead>(mut reader: R) -> Result<ParseOutcome, ParseError> {
    let mut parser = Parser::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        if let Cow::Owned(_) = line {
            debug!(line_no = parser.line_no + 1, "replaced invalid UTF-8 in line");
        }
        parser.feed(&line);
    }
    Ok(parser.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const EXAMPLE: &str = "\
*filter
:INPUT DROP [0:0]
:LOG_DROP - [0:0]
[10:500] -A INPUT -p tcp --dport 22 -j LOG_DROP
[3:120] -A LOG_DROP -j LOG
[3:120] -A LOG_DROP -j DROP
COMMIT
";

    fn targets(ruleset: &Ruleset, table: &str, chain: &str) -> Vec<String> {
        ruleset
            .table(table)
            .and_then(|t| t.chain(chain))
            .map(|c| c.targets().map(str::to_string).collect())
            .unwrap_or_default()
    }

    #[test]
    fn parses_the_reference_example() {
        let outcome = parse_str(EXAMPLE);
        assert!(outcome.is_clean());

        let filter = outcome.ruleset.table("filter").expect("filter table");
        let names: Vec<_> = filter.chains().map(|(name, _)| name).collect();
        assert_eq!(names, ["INPUT", "LOG_DROP"]);

        let input = filter.chain("INPUT").unwrap();
        assert_eq!(input.policy(), Some("DROP"));
        assert_eq!(input.rules().len(), 1);
        assert_eq!(targets(&outcome.ruleset, "filter", "INPUT"), ["LOG_DROP"]);

        let log_drop = filter.chain("LOG_DROP").unwrap();
        assert_eq!(log_drop.policy(), None);
        assert_eq!(log_drop.rules().len(), 2);
        assert!(targets(&outcome.ruleset, "filter", "LOG_DROP").is_empty());

        let first = &input.rules()[0];
        assert_eq!(first.packets(), Some(10));
        assert_eq!(first.bytes(), Some(500));
        assert_eq!(first.conditions_str(), "-p tcp --dport 22");
        assert_eq!(
            input.lines(),
            ["[10:500] -A INPUT -p tcp --dport 22 -j LOG_DROP"]
        );
    }

    #[test]
    fn rule_count_matches_append_lines() {
        let input = "\
*filter
:INPUT ACCEPT [0:0]
:FORWARD ACCEPT [0:0]
-A INPUT -i lo -j ACCEPT
-A FORWARD -j DROP
-A INPUT -m state --state ESTABLISHED -j ACCEPT
-A INPUT -j DROP
COMMIT
";
        let outcome = parse_str(input);
        let filter = outcome.ruleset.table("filter").unwrap();
        assert_eq!(filter.chain("INPUT").unwrap().rules().len(), 3);
        assert_eq!(filter.chain("FORWARD").unwrap().rules().len(), 1);
    }

    #[test]
    fn edges_require_prior_declaration() {
        let input = "\
*filter
:INPUT ACCEPT [0:0]
-A INPUT -j LATE
:LATE - [0:0]
-A INPUT -j LATE
COMMIT
";
        let outcome = parse_str(input);
        let chain = outcome.ruleset.table("filter").unwrap().chain("INPUT").unwrap();
        assert_eq!(chain.rules().len(), 2);
        assert!(chain.has_target("LATE"));

        let first_only = parse_str("*filter\n:INPUT ACCEPT [0:0]\n-A INPUT -j LATE\n:LATE - [0:0]\n");
        let chain = first_only.ruleset.table("filter").unwrap().chain("INPUT").unwrap();
        assert!(!chain.has_target("LATE"));
        assert_eq!(chain.rules()[0].target, "LATE");
    }

    #[test]
    fn edges_stay_within_their_table() {
        let input = "\
*nat
:DOCKER - [0:0]
COMMIT
*filter
:FORWARD ACCEPT [0:0]
-A FORWARD -j DOCKER
COMMIT
";
        let outcome = parse_str(input);
        assert!(targets(&outcome.ruleset, "filter", "FORWARD").is_empty());
    }

    #[test]
    fn commit_without_table_is_a_no_op() {
        let outcome = parse_str("COMMIT\n");
        assert!(outcome.ruleset.is_empty());
        assert!(outcome.is_clean());
    }

    #[test]
    fn garbage_is_reported_and_skipped() {
        let outcome = parse_str("*filter\n:INPUT ACCEPT [0:0]\ngarbage text\nCOMMIT\n");
        assert_eq!(
            outcome.issues,
            [ParseIssue::Unrecognized {
                line_no: 3,
                line: "garbage text".into(),
            }]
        );
        let clean = parse_str("*filter\n:INPUT ACCEPT [0:0]\nCOMMIT\n");
        assert_eq!(outcome.ruleset, clean.ruleset);
    }

    #[test]
    fn lines_after_commit_are_context_errors() {
        let outcome = parse_str("*filter\n:INPUT ACCEPT [0:0]\nCOMMIT\n:LATE - [0:0]\n-A INPUT -j ACCEPT\n");
        assert_eq!(outcome.issues.len(), 2);
        assert!(outcome.issues.iter().all(ParseIssue::is_context_error));
        assert!(matches!(
            outcome.issues[0],
            ParseIssue::NoCurrentTable {
                line_no: 4,
                context: LineContext::Chain,
                ..
            }
        ));
        let filter = outcome.ruleset.table("filter").unwrap();
        assert!(!filter.contains_chain("LATE"));
        assert!(filter.chain("INPUT").unwrap().rules().is_empty());
    }

    #[test]
    fn rule_for_undeclared_chain_is_reported() {
        let outcome = parse_str("*filter\n-A MISSING -j ACCEPT\nCOMMIT\n");
        assert!(matches!(
            &outcome.issues[..],
            [ParseIssue::UnknownChain { table, chain, .. }] if table == "filter" && chain == "MISSING"
        ));
    }

    #[test]
    fn repeated_table_replaces_the_first() {
        let outcome = parse_str("*filter\n:A - [0:0]\nCOMMIT\n*nat\nCOMMIT\n*filter\n:B - [0:0]\nCOMMIT\n");
        let names: Vec<_> = outcome.ruleset.table_names().collect();
        assert_eq!(names, ["filter", "nat"]);
        let filter = outcome.ruleset.table("filter").unwrap();
        assert!(!filter.contains_chain("A"));
        assert!(filter.contains_chain("B"));
    }

    #[test]
    fn whitespace_and_comments_are_ignored() {
        let input = "# Generated by iptables-save\n\n   *filter  \n\t:INPUT ACCEPT [0:0]\n\n  COMMIT\n# Completed\n";
        let outcome = parse_str(input);
        assert!(outcome.is_clean());
        assert!(outcome.ruleset.table("filter").unwrap().contains_chain("INPUT"));
    }

    #[test]
    fn parsing_is_deterministic() {
        assert_eq!(parse_str(EXAMPLE), parse_str(EXAMPLE));
    }

    #[test]
    fn reader_input_matches_str_input() {
        let from_reader = parse_reader(EXAMPLE.as_bytes()).expect("in-memory read");
        assert_eq!(from_reader, parse_str(EXAMPLE));
    }

    #[test]
    fn invalid_utf8_line_does_not_abort_the_read() {
        let mut input = b"*filter\n:INPUT DROP [0:0]\n-A INPUT -m comment --comment \"caf".to_vec();
        input.push(0xE9);
        input.extend_from_slice(b"\" -j ACCEPT\n-A INPUT -j DROP\nCOMMIT\n");

        let outcome = parse_reader(&input[..]).expect("in-memory read");
        assert!(outcome.is_clean());

        let input_chain = outcome.ruleset.table("filter").unwrap().chain("INPUT").unwrap();
        assert_eq!(input_chain.rules().len(), 2);
        assert_eq!(input_chain.rules()[0].target, "ACCEPT");
        assert!(input_chain.rules()[0].conditions_str().contains('\u{FFFD}'));
        assert_eq!(input_chain.rules()[1].target, "DROP");
    }

    #[test]
    fn crlf_line_endings_are_trimmed() {
        let input = EXAMPLE.replace('\n', "\r\n");
        let from_reader = parse_reader(input.as_bytes()).expect("in-memory read");
        assert_eq!(from_reader, parse_str(EXAMPLE));
    }
}
