pub mod config;
pub mod diff;
pub mod env;
pub mod events;
pub mod templates;
pub mod types;
pub mod validation;

pub use config::*;
pub use diff::*;
pub use env::*;
pub use events::*;
pub use templates::*;
pub use types::*;
pub use validation::*;
