pub mod position;
pub mod state;

pub use position::Position;
pub use state::PortfolioState;
