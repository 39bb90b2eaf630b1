use super::{AutoGenRule, RuleApplyType};
use crate::config::AutoUnrollConfig;
use crate::error::Result;
use crate::ir::attr::{keys, AttrKey};
use crate::ir::expr::find_accumulation;
use crate::ir::{ModuleExpr, Stmt, StmtId};
use log::{debug, info};

const OWNED_ATTR_KEYS: &[AttrKey] = &[keys::AUTO_UNROLL_MAX_STEP];

/// Candidates recorded by the last `init`.
#[derive(Debug, Clone)]
struct Applicable {
    candidates: Vec<StmtId>,
    revision: u64,
    applied: bool,
}

/// Annotates a reduction's schedule block with how far codegen should unroll
/// its loop nest ([`keys::AUTO_UNROLL_MAX_STEP`]).
///
/// A block is a candidate when it carries no attributes yet, accumulates over
/// at least one reduce axis with more than one iteration, and none of its
/// enclosing loops is parallel, vectorized, GPU-bound or empty.
///
/// The step is the product of the extents of the innermost
/// [`AutoUnrollConfig::max_depth`] enclosing loops, clamped to
/// [`AutoUnrollConfig::max_step`].
#[derive(Debug, Clone, Default)]
pub struct AutoUnroll {
    config: AutoUnrollConfig,
    state: Option<Applicable>,
}

impl AutoUnroll {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AutoUnrollConfig) -> Result<Self> {
        config.validate()?;
        Ok(AutoUnroll {
            config,
            state: None,
        })
    }

    pub fn config(&self) -> &AutoUnrollConfig {
        &self.config
    }

    fn meets_condition(&self, module: &ModuleExpr, id: StmtId) -> bool {
        let block = match module.schedule_block(id) {
            Some(block) => block,
            None => return false,
        };

        // Don't stack a second tuning directive on an annotated block.
        if !block.attrs.is_empty() {
            return false;
        }

        if !block.reduce_iter_vars().any(|iv| iv.extent > 1) {
            return false;
        }

        let loops_ok = module
            .enclosing_loops(id)
            .iter()
            .all(|&loop_id| match module[loop_id] {
                Stmt::For { extent, kind, .. } => extent > 0 && !kind.is_bound(),
                _ => unreachable!(),
            });
        if !loops_ok {
            debug!("{}: loop nest is bound or empty", block.name);
            return false;
        }

        find_accumulation(&block.body, &block.name).is_some()
    }

    fn applicable(&self) -> &Applicable {
        match &self.state {
            Some(state) => state,
            None => panic!("{}: used before init", self.name()),
        }
    }

    fn assert_unmodified(&self, module: &ModuleExpr) {
        assert_eq!(
            module.revision(),
            self.applicable().revision,
            "{}: module was modified since init",
            self.name()
        );
    }

    fn candidate(&self, index: usize) -> StmtId {
        let candidates = &self.applicable().candidates;
        assert!(
            index < candidates.len(),
            "{}: candidate index {} out of range (have {})",
            self.name(),
            index,
            candidates.len()
        );
        candidates[index]
    }

    /// The step [`AutoGenRule::apply`] would write for candidate `index`.
    /// Never mutates, and always gives the same answer for the same module.
    /// `module` must be the module passed to `init`, unmodified since.
    pub fn unroll_step(&self, module: &ModuleExpr, index: usize) -> i32 {
        self.assert_unmodified(module);
        let id = self.candidate(index);
        let product = module
            .enclosing_loops(id)
            .iter()
            .take(self.config.max_depth)
            .map(|&loop_id| match module[loop_id] {
                Stmt::For { extent, .. } => extent as u64,
                _ => unreachable!(),
            })
            .fold(1u64, |acc, extent| acc.saturating_mul(extent));

        let max_step = self.config.max_step as u64;
        if product > max_step {
            debug!(
                "{}: clamping unroll step {} of candidate {} to {}",
                self.name(),
                product,
                index,
                max_step
            );
            self.config.max_step
        } else {
            product as i32
        }
    }
}

impl AutoGenRule for AutoUnroll {
    fn name(&self) -> &'static str {
        "AutoUnroll"
    }

    fn owned_attr_keys(&self) -> &'static [AttrKey] {
        OWNED_ATTR_KEYS
    }

    fn init(&mut self, module: &ModuleExpr) -> Result<RuleApplyType> {
        self.state = None;
        let candidates: Vec<StmtId> = module
            .schedule_block_realizes()?
            .into_iter()
            .filter(|&id| self.meets_condition(module, id))
            .collect();

        debug!("{}: candidates {:?}", self.name(), candidates);
        info!(
            "{}: {} applicable schedule block(s)",
            self.name(),
            candidates.len()
        );

        let apply_type = if candidates.is_empty() {
            RuleApplyType::CannotApply
        } else {
            RuleApplyType::ApplyAndSkipThisRule
        };
        self.state = Some(Applicable {
            candidates,
            revision: module.revision(),
            applied: false,
        });
        Ok(apply_type)
    }

    fn number_applicable(&self) -> usize {
        self.applicable().candidates.len()
    }

    fn apply(&mut self, module: &mut ModuleExpr, index: usize) -> Result<()> {
        assert!(
            !self.applicable().applied,
            "{}: already applied since the last init",
            self.name()
        );
        self.assert_unmodified(module);
        let id = self.candidate(index);
        let step = self.unroll_step(module, index);

        let block = module
            .schedule_block_mut(id)
            .expect("candidates are schedule blocks");
        assert!(
            block.attrs.is_empty(),
            "{}: {} is already annotated",
            self.name(),
            block.name
        );
        block.attrs.insert(keys::AUTO_UNROLL_MAX_STEP, step);
        debug!("{}: {} gets unroll step {}", self.name(), block.name, step);

        if let Some(state) = self.state.as_mut() {
            state.applied = true;
        }
        Ok(())
    }
}
