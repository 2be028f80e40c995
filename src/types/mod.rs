pub mod price_point;
pub mod period;
pub mod chart;
pub mod exchange_rate;
pub mod market;

pub use price_point::*;
pub use period::*;
pub use chart::*;
pub use exchange_rate::*;
pub use market::*;
