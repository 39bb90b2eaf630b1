use crate::error::{ConfigOutOfRangeSnafu, InvalidConfigSnafu, Result};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

/// Hard ceiling on the unroll step. Larger steps blow up generated code size.
pub const MAX_UNROLL_STEP: i32 = 128;

/// Tuning knobs of [`crate::auto_gen_rule::AutoUnroll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutoUnrollConfig {
    /// Steps above this are clamped down to it. At most [`MAX_UNROLL_STEP`].
    pub max_step: i32,
    /// How many enclosing loops, innermost first, contribute to the step.
    pub max_depth: usize,
}

impl Default for AutoUnrollConfig {
    fn default() -> Self {
        AutoUnrollConfig {
            max_step: MAX_UNROLL_STEP,
            max_depth: 3,
        }
    }
}

impl AutoUnrollConfig {
    /// Parses and validates a JSON config; missing fields take defaults.
    /// ```
    /// use autosched::config::AutoUnrollConfig;
    /// let config = AutoUnrollConfig::from_json_str(r#"{ "max_depth": 1 }"#).unwrap();
    /// assert_eq!(config.max_depth, 1);
    /// assert_eq!(config.max_step, 128);
    /// ```
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: AutoUnrollConfig = serde_json::from_str(s).context(InvalidConfigSnafu)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_step < 1 || self.max_step > MAX_UNROLL_STEP {
            return ConfigOutOfRangeSnafu {
                field: "max_step",
                value: self.max_step as i64,
                min: 1i64,
                max: MAX_UNROLL_STEP as i64,
            }
            .fail();
        }
        if self.max_depth < 1 {
            return ConfigOutOfRangeSnafu {
                field: "max_depth",
                value: self.max_depth as i64,
                min: 1i64,
                max: i64::MAX,
            }
            .fail();
        }
        Ok(())
    }
}
