use crate::auto_gen_rule::{AutoGenRule, RuleApplyType};
use crate::error::{OverlappingAttrKeysSnafu, Result};
use crate::ir::ModuleExpr;
use crate::sampler::IndexSampler;
use log::{debug, info};

/// What one rule did during [`RuleRegistry::apply_round`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    pub rule: &'static str,
    pub apply_type: RuleApplyType,
    pub number_applicable: usize,
}

/// The ordered set of rules a search driver explores with.
#[derive(Default)]
pub struct RuleRegistry {
    rules: Vec<Box<dyn AutoGenRule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `rule`. Fails if it writes an attribute key some registered
    /// rule already writes.
    pub fn register(&mut self, rule: Box<dyn AutoGenRule>) -> Result<()> {
        for existing in &self.rules {
            if let Some(key) = rule
                .owned_attr_keys()
                .iter()
                .copied()
                .find(|key| existing.owned_attr_keys().contains(key))
            {
                return OverlappingAttrKeysSnafu {
                    key,
                    existing: existing.name(),
                    incoming: rule.name(),
                }
                .fail();
            }
        }
        debug!("registered rule {}", rule.name());
        self.rules.push(rule);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Runs every rule once, in registration order, against `module`: each
    /// rule is initialized on the module as left by the previous rules and,
    /// if applicable, applied to one randomly chosen candidate. Any error
    /// aborts the round.
    pub fn apply_round(
        &mut self,
        module: &mut ModuleExpr,
        sampler: &mut dyn IndexSampler,
    ) -> Result<Vec<RuleOutcome>> {
        let mut outcomes = Vec::with_capacity(self.rules.len());
        for rule in self.rules.iter_mut() {
            let apply_type = rule.init(module)?;
            let number_applicable = rule.number_applicable();
            match apply_type {
                RuleApplyType::CannotApply => {}
                RuleApplyType::ApplyAndSkipThisRule => rule.apply_randomly(module, sampler)?,
            }
            info!(
                "{}: {:?} with {} candidate(s)",
                rule.name(),
                apply_type,
                number_applicable
            );
            outcomes.push(RuleOutcome {
                rule: rule.name(),
                apply_type,
                number_applicable,
            });
        }
        debug!("after round:\n{}", module);
        Ok(outcomes)
    }
}
