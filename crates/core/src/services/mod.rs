mod ddm;
mod paginator;

pub use ddm::*;
pub use paginator::*;
