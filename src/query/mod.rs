pub mod join;
pub mod server;
pub mod table;

pub use join::indices_as_table;
pub use server::QueryServer;
pub use table::{IndexRow, IndexTable};
