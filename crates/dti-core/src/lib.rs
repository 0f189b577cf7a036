pub mod classifier;
pub mod diagnostics;
pub mod model;
pub mod parser;
pub mod stats;
pub mod targets;

pub use classifier::*;
pub use diagnostics::*;
pub use model::*;
pub use parser::*;
pub use stats::*;
pub use targets::*;

// iptables-save parsing and ruleset model
