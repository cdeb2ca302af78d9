mod account;
pub mod announcer;
pub mod pool;
mod score;
mod transactions;

pub use pool::{PendingBlock, Pool};
pub use transactions::BlockInfo;
use score::ScoreTransaction;
use transactions::Transactions;
