pub mod engine;
pub mod observable;
pub mod state;

pub use engine::{ItemList, Listing};
pub use observable::Observable;
pub use state::OperationState;
