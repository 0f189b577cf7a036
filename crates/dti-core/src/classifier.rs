// Line classification for iptables-save input
use crate::model::{Counters, JumpVerb};
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// What a single trimmed input line declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// `*filter`
    Table { name: &'a str },
    /// `:INPUT DROP [0:0]`
    Chain {
        name: &'a str,
        policy: &'a str,
        counters: &'a str,
    },
    /// `[1:60] -A INPUT -p tcp -j ACCEPT`
    Rule(RuleLine<'a>),
    Commit,
    /// `# Generated by iptables-save`
    Comment { text: &'a str },
    Unrecognized,
}

/// Captured fields of a rule line. Optional parts that are missing from
/// the line are `None`, which is distinct from present-but-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleLine<'a> {
    pub counters: Option<Counters>,
    pub chain: &'a str,
    pub conditions: Option<&'a str>,
    pub verb: JumpVerb,
    pub target: &'a str,
    pub extra: Option<&'a str>,
}

/// Builds a line kind from a successful match; `None` rejects the line.
type Build = for<'a> fn(&Captures<'a>) -> Option<LineKind<'a>>;

/// Evaluated in order; the first matching pattern decides the line kind.
static PATTERNS: LazyLock<[(Regex, Build); 5]> = LazyLock::new(|| {
    [
        (
            Regex::new(r"^\*(?P<table>\S+)").expect("valid table pattern"),
            build_table as Build,
        ),
        (
            Regex::new(r"^:(?P<chain>\S+) (?P<policy>\S+) (?P<counters>\S+)")
                .expect("valid chain pattern"),
            build_chain as Build,
        ),
        (
            Regex::new(
                r"^(\[(?P<packets>\d+):(?P<bytes>\d+)\] )?-A (?P<chain>\S+)( (?P<conditions>.*))?( -(?P<verb>[jg]) (?P<target>\S*))( (?P<extra>.*))?",
            )
            .expect("valid rule pattern"),
            build_rule as Build,
        ),
        (
            Regex::new(r"^COMMIT$").expect("valid commit pattern"),
            build_commit as Build,
        ),
        (
            Regex::new(r"^#(?P<comment>.*)").expect("valid comment pattern"),
            build_comment as Build,
        ),
    ]
});

/// Classify one line. Callers are expected to trim it first.
pub fn classify(line: &str) -> LineKind<'_> {
    for (pattern, build) in PATTERNS.iter() {
        if let Some(caps) = pattern.captures(line) {
            return build(&caps).unwrap_or(LineKind::Unrecognized);
        }
    }
    LineKind::Unrecognized
}

fn group<'a>(caps: &Captures<'a>, name: &str) -> Option<&'a str> {
    caps.name(name).map(|m| m.as_str())
}

fn build_table<'a>(caps: &Captures<'a>) -> Option<LineKind<'a>> {
    Some(LineKind::Table {
        name: group(caps, "table")?,
    })
}

fn build_chain<'a>(caps: &Captures<'a>) -> Option<LineKind<'a>> {
    Some(LineKind::Chain {
        name: group(caps, "chain")?,
        policy: group(caps, "policy")?,
        counters: group(caps, "counters")?,
    })
}

fn build_rule<'a>(caps: &Captures<'a>) -> Option<LineKind<'a>> {
    let counters = match (group(caps, "packets"), group(caps, "bytes")) {
        (Some(packets), Some(bytes)) => Some(Counters {
            packets: packets.parse().ok()?,
            bytes: bytes.parse().ok()?,
        }),
        _ => None,
    };
    let verb = match group(caps, "verb")? {
        "g" => JumpVerb::Goto,
        _ => JumpVerb::Jump,
    };

    Some(LineKind::Rule(RuleLine {
        counters,
        chain: group(caps, "chain")?,
        conditions: group(caps, "conditions"),
        verb,
        target: group(caps, "target")?,
        extra: group(caps, "extra"),
    }))
}

fn build_commit<'a>(_caps: &Captures<'a>) -> Option<LineKind<'a>> {
    Some(LineKind::Commit)
}

fn build_comment<'a>(caps: &Captures<'a>) -> Option<LineKind<'a>> {
    Some(LineKind::Comment {
        text: group(caps, "comment")?,
    })
}
