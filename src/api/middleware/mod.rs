mod auth;

pub use auth::{AuthedWorkspace, WorkspaceAuth};
