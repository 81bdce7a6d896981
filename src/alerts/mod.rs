pub mod classifier;
pub mod state_machine;

pub use classifier::{classify, classify_incremental, Band, BandCheck};
pub use state_machine::{AlertState, Status};
