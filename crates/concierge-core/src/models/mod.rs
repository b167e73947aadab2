pub mod query;
pub mod result;

pub use query::*;
pub use result::*;
