//! Workspace shape: projects, their dependency edges, file ownership, and
//! the binary classpath stubs each project can see.

mod model;
mod stubs;

pub use model::{Project, Workspace};
pub use stubs::{internal_to_binary, ClassStub, ClasspathStubs};
