mod adapter;
mod order;
mod pagination;
mod search;
mod source;

pub use adapter::*;
pub use order::*;
pub use pagination::*;
pub use search::*;
pub use source::*;
