pub mod path;

pub use path::{PathGuard, PathGuardError};
