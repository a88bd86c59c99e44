pub mod classify;
pub mod flags;
pub mod status;

pub use classify::{classify, classify_all};
pub use flags::{RawStatusEntry, StatusFlags};
pub use status::{StatusClass, StatusEntry, StatusSnapshot};
