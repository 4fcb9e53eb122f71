pub mod service;

pub use service::{AsyncService, AsyncServiceError, AsyncServiceFuture, AsyncServiceResult};
