pub mod control;
pub mod transport;

pub use control::*;
pub use transport::*;
