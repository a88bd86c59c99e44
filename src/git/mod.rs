pub mod backend;
pub mod ops;

pub use backend::{GitBackend, MutationOp, RepositoryBackend};
