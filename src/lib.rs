//! Auto-scheduling rules for a tensor-program compiler.
//!
//! A search driver hands a lowered [`ir::ModuleExpr`] to the rules in a
//! [`registry::RuleRegistry`]. Each rule finds candidate schedule blocks and
//! mutates one of them, typically by writing an attribute that code
//! generation reads later (see [`ir::attr::keys`]). The only rule so far is
//! [`auto_gen_rule::AutoUnroll`].

pub mod auto_gen_rule;
pub mod config;
pub mod error;
pub mod ir;
pub mod registry;
pub mod sampler;

pub use error::{Error, Result};
