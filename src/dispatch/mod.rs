pub mod dispatcher;
pub mod retry;
pub mod tiers;

pub use dispatcher::{Dispatcher, Extraction};
pub use retry::RetryPolicy;
pub use tiers::Tier;
