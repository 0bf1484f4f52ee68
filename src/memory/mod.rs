pub mod replay;
pub mod transition;

pub use replay::{EvictionPolicy, Memory};
pub use transition::{GameMemory, Transition};
