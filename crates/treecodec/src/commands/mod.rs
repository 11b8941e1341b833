pub mod check;
pub mod normalize;
pub mod schema;

pub use check::*;
pub use normalize::*;
pub use schema::*;
