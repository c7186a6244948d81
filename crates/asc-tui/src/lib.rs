pub mod app;
pub mod error;
pub mod event;
pub mod model;
pub mod runner;
pub mod ui;

pub use app::*;
pub use error::*;
pub use event::*;
pub use model::*;
pub use runner::*;
pub use ui::*;
