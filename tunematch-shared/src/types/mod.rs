pub mod api;
pub mod event;
pub mod pagination;
pub mod viewer;

pub use api::*;
pub use event::*;
pub use pagination::*;
pub use viewer::*;
