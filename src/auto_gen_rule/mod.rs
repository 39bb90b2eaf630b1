//! Rules that automatically generate schedule mutations.
//!
//! Every rule follows the same protocol, driven by a search driver holding
//! one module per exploration round:
//!
//!  1. [`AutoGenRule::init`] scans the module without touching it and records
//!     the candidate sites the rule could mutate.
//!  2. [`AutoGenRule::number_applicable`] reports how many were found.
//!  3. [`AutoGenRule::apply`] or [`AutoGenRule::apply_randomly`] mutates one
//!     of them.
//!
//! Calling these out of order, with an out-of-range index, or on a module
//! changed since `init` is a bug in the driver, and panics.

mod auto_unroll;

pub use auto_unroll::AutoUnroll;

use crate::error::Result;
use crate::ir::attr::AttrKey;
use crate::ir::ModuleExpr;
use crate::sampler::IndexSampler;

/// The outcome of [`AutoGenRule::init`].
///
/// Only single-shot rules exist so far, so there is no outcome for rules that
/// want to be applied repeatedly within one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleApplyType {
    /// No candidate site qualifies.
    CannotApply,
    /// At least one site qualifies. The rule mutates exactly one of them and
    /// must not be reconsidered for the rest of the round.
    ApplyAndSkipThisRule,
}

pub trait AutoGenRule {
    fn name(&self) -> &'static str;

    /// The attribute keys this rule writes. Registered rules must not share
    /// keys.
    fn owned_attr_keys(&self) -> &'static [AttrKey];

    /// Fails if `module` is malformed; never mutates it.
    fn init(&mut self, module: &ModuleExpr) -> Result<RuleApplyType>;

    /// Number of candidates found by the last `init`.
    fn number_applicable(&self) -> usize;

    /// Mutates candidate `index` of the last `init`. `module` must be the
    /// module passed to `init`, unmodified since.
    fn apply(&mut self, module: &mut ModuleExpr, index: usize) -> Result<()>;

    /// Like [`AutoGenRule::apply`], on a candidate chosen by `sampler`.
    fn apply_randomly(
        &mut self,
        module: &mut ModuleExpr,
        sampler: &mut dyn IndexSampler,
    ) -> Result<()> {
        let n = self.number_applicable();
        assert!(n > 0, "{}: no applicable candidates to apply", self.name());
        let index = sampler.sample_index(n);
        self.apply(module, index)
    }
}
