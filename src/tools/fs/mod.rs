pub mod create;
pub mod list;
pub mod read;

pub use create::CreateTool;
pub use list::ListTool;
pub use read::ReadTool;
