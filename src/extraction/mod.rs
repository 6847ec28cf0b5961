//! Rate extraction strategies and the reconciler that chains them

pub mod fallback;
pub mod generic;
pub mod period;
pub mod reconciler;

pub use fallback::*;
pub use generic::*;
pub use period::*;
pub use reconciler::*;
