pub mod audio;
pub mod media;
pub mod storage;
pub mod synth;
pub mod transport;
pub mod types;

pub use audio::*;
pub use media::*;
pub use storage::*;
pub use synth::*;
pub use transport::*;
pub use types::*;
