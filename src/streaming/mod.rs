pub mod client;
pub mod parser;

pub use client::{ChatParams, ChatTransport, HttpTransport, ProviderConfig, TransportError, TransportEvent};
pub use parser::{StreamEvent, StreamParser};
