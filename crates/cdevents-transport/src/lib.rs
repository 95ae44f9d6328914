//! CDEvents delivery
//!
//! - Transport: one delivery attempt to one destination
//! - ConsoleTransport / FileTransport / HttpTransport: concrete destinations
//! - MultiTransport: fan-out with per-member failure aggregation
//! - TransportFactory: descriptor string to transport
//! - RetryingSender: bounded retry under a deadline and cancellation token

pub mod error;
pub mod factory;
pub mod http;
pub mod multi;
pub mod retry;
pub mod transport;

pub use error::{MemberFailure, Result, TransportError};
pub use factory::TransportFactory;
pub use http::{HttpOptions, HttpTransport};
pub use multi::MultiTransport;
pub use retry::{RetryPolicy, RetryingSender};
pub use transport::{ConsoleTransport, FileTransport, Transport};

pub use tokio_util::sync::CancellationToken;
