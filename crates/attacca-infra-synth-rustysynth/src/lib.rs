pub mod player;
pub mod transport;

pub use player::*;
pub use transport::*;
