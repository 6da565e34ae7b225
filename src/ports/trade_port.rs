//! Trade loader port trait.

use crate::domain::error::TradeblocksError;
use crate::domain::trade::Trade;

pub trait TradePort {
    /// Load the trades of a persisted block, in opened order.
    /// Fails with [`TradeblocksError::BlockNotFound`] when the block is absent.
    fn load_trades(&self, block_id: &str) -> Result<Vec<Trade>, TradeblocksError>;
}
