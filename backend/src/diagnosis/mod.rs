pub mod policy;
pub mod session;
pub mod store;

pub use policy::{DiagnoseError, Orchestrator};
pub use session::SessionResult;
pub use store::SessionStore;
