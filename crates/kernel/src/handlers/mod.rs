//! Built-in handlers, one per functional area.

pub mod accounts;
pub mod language;
pub mod management;

pub use accounts::AccountsHandler;
pub use language::LanguageHandler;
pub use management::ManagementHandler;
