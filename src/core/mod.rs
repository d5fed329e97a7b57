pub mod partition;
pub mod value;

pub use partition::*;
pub use value::*;
