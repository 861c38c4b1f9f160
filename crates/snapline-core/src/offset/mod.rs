mod collection;
mod loader;
mod signature;

pub use collection::*;
pub use loader::*;
pub use signature::*;
