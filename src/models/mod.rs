pub mod order;
pub mod summary;

pub use order::*;
pub use summary::*;
