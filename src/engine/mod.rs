pub mod candidates;
pub mod claims;
pub mod coordinator;
pub mod dispatch;
pub mod locks;

pub use claims::{ClaimStore, Resolution};
pub use coordinator::StateCoordinator;
pub use dispatch::{DispatchOutcome, DispatchState, Dispatcher, NewOrder};
