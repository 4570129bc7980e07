//! Strategy storage port trait.

use crate::domain::error::RulecraftError;
use crate::domain::strategy::Strategy;
use std::path::Path;

pub trait StrategyPort {
    fn load_strategy(&self, path: &Path) -> Result<Strategy, RulecraftError>;
}
