pub mod config;
pub mod logging;

pub mod compose;
pub mod control;
pub mod notify;
pub mod proxy;
pub mod retry;
pub mod upstream;

pub use compose::ResponsePayload;
pub use proxy::{Caller, ChatRequest, ProxyError, RetryProxy};
