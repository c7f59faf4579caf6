//! Gate-side client: HTTP calls to the server plus the offline submission queue.

pub mod errors;
pub mod http;
pub mod queue;
pub mod session;

pub use errors::ClientError;
pub use http::GateClient;
pub use queue::{FlushReport, OfflineQueue, QueuedVisitor};
pub use session::Session;
