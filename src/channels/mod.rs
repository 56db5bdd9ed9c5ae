pub mod hub;
pub mod queue;

pub use hub::ChannelHub;
pub use queue::Queue;
