pub mod control;
pub mod error;
pub mod pid_store;
pub mod signal;
pub mod supervisor;
pub mod types;

pub use control::*;
pub use error::*;
pub use pid_store::*;
pub use signal::*;
pub use supervisor::*;
pub use types::*;
