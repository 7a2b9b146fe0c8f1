pub mod engine;
pub mod ledger;
pub mod loop_state;
pub mod marker;
pub mod snapshot;
