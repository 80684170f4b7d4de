pub mod cursor;
pub mod effects;
pub mod hooks;
pub mod loop_machine;
pub mod timebase;

pub use cursor::*;
pub use effects::*;
pub use hooks::*;
pub use loop_machine::*;
pub use timebase::*;
