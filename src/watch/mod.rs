pub mod coalescer;
pub mod event;
pub mod notification;
pub mod pipeline;
pub mod session;
pub mod sync;

pub use coalescer::{ChangeCoalescer, ChangeFilter};
pub use event::{ChangeKind, FileChange};
pub use notification::Notification;
pub use pipeline::{RefreshPipeline, RootToken};
pub use session::{EventCallback, NativeWatchProvider, SessionState, WatchProvider, WatchSession};
pub use sync::StatusSync;
