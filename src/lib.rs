// Library surface for headless/integration tests and reuse.
pub mod alarm;
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod errors;
pub mod record;
pub mod runtime;
pub mod session;
pub mod store;
pub mod ui;
pub mod util;

pub use app::App;
pub use errors::{FlowError, FlowResult};
