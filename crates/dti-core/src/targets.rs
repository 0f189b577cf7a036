use crate::model::Table;
use serde::Serialize;
use std::collections::BTreeSet;

/// Chains the kernel creates in every table that uses them.
pub const BUILTIN_CHAINS: &[&str] = &["PREROUTING", "INPUT", "FORWARD", "OUTPUT", "POSTROUTING"];

/// Target extensions shipped with iptables.
pub const BUILTIN_TARGETS: &[&str] = &[
    "ACCEPT",
    "RETURN",
    "DROP",
    "AUDIT",
    "CHECKSUM",
    "CLASSIFY",
    "CLUSTERIP",
    "CONNMARK",
    "CONNSECMARK",
    "CT",
    "DNAT",
    "DNPT",
    "DSCP",
    "ECN",
    "HL",
    "HMARK",
    "IDLETIMER",
    "LED",
    "LOG",
    "MARK",
    "MASQUERADE",
    "NETMAP",
    "NFLOG",
    "NFQUEUE",
    "NOTRACK",
    "RATEEST",
    "REDIRECT",
    "REJECT",
    "SECMARK",
    "SET",
    "SNAT",
    "SNPT",
    "SYNPROXY",
    "TCPMSS",
    "TCPOPTSTRIP",
    "TEE",
    "TOS",
    "TPROXY",
    "TRACE",
    "TTL",
    "ULOG",
];

pub fn is_builtin_chain(name: &str) -> bool {
    BUILTIN_CHAINS.contains(&name)
}

/// How a rule's jump target resolves within its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// A chain declared in the same table
    Chain,
    /// A terminal action provided by an extension
    Builtin,
    /// Neither; the table never declares a chain of that name
    Unknown,
}

/// Built-in target names, optionally extended for third-party target modules.
#[derive(Debug, Clone, Default)]
pub struct TargetCatalog {
    extra: BTreeSet<String>,
}

impl TargetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extra: extra.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        BUILTIN_TARGETS.contains(&name) || self.extra.contains(name)
    }

    /// Every recognized built-in name, stock targets first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        BUILTIN_TARGETS
            .iter()
            .copied()
            .chain(self.extra.iter().map(String::as_str))
    }

    /// Resolves against the finished table, so a chain declared after the
    /// rule that names it is still `Chain` even though the parse recorded
    /// no edge for it. A declared chain wins over a built-in of the same name.
    pub fn classify(&self, table: &Table, target: &str) -> TargetKind {
        if table.contains_chain(target) {
            TargetKind::Chain
        } else if self.is_builtin(target) {
            TargetKind::Builtin
        } else {
            TargetKind::Unknown
        }
    }
}
