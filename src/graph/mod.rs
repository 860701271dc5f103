pub mod content;
pub mod kind;
pub mod model;

pub use content::*;
pub use kind::*;
pub use model::*;
