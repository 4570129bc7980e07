//! Market data port trait.

use crate::domain::error::RulecraftError;
use crate::domain::ohlcv::OhlcvBar;

pub trait DataPort {
    /// Bars for `symbol`, ordered oldest to newest.
    fn fetch_ohlcv(&self, symbol: &str) -> Result<Vec<OhlcvBar>, RulecraftError>;

    /// Symbols this source can serve, sorted.
    fn list_symbols(&self) -> Result<Vec<String>, RulecraftError>;
}
