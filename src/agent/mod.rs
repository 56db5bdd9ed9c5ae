pub mod completion;
pub mod driver;
pub mod scope;

pub use driver::{AgentDriver, DriverConfig, TaskResult};
pub use scope::AgentScope;
