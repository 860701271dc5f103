pub mod path;
pub mod schema;
pub mod shape;

pub use path::*;
pub use shape::*;
