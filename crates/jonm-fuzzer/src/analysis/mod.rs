//! Static analyzers over IL programs
//!
//! All analyzers are value-owning state machines rebuilt per program; none
//! hold global state. The sweeping analyzers (context, dead code) advance
//! one instruction at a time; the others are built once per program.

mod context;
mod dead_code;
mod def_use;
mod recursion;

pub use context::{Context, ContextAnalyzer};
pub use dead_code::DeadCodeAnalyzer;
pub use def_use::DefUseAnalyzer;
pub use recursion::may_recurse_unboundedly;
