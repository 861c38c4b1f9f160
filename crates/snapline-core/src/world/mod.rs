mod entity;
mod producer;
mod snapshot;

pub use entity::{EntityCategory, EntityRecord};
pub use producer::WorldProducer;
pub use snapshot::{LocalPlayer, WorldSnapshot};
