mod images;
mod publisher;

pub use images::{ImageProvider, ImageProviders};
pub use publisher::{publisher_from_config, PublishReceipt, Publisher, SimulatedPublisher};
