pub mod api;
pub mod message;
pub mod viz;

pub use message::{ChatMessage, Role};
pub use viz::{ChartSpec, StackedBarSpec, TableSpec, Visualization};
