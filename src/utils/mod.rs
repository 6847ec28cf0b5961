//! Utility modules

pub mod dates;
pub mod memory_lookup;
pub mod money;

pub use dates::*;
pub use memory_lookup::*;
pub use money::*;
