//! swell-client — HTTP client for the monitored service.
//!
//! Wraps the two outbound operations the control loop needs:
//!
//! - `GET {base_url}/status` → [`ServiceStatus`](swell_core::ServiceStatus)
//! - `PUT {base_url}/replicas` with `{"replicas": n}`
//!
//! Both return `Result<_, ClientError>` and never panic. The client holds
//! no retry logic: transient failures are expected here and the loop
//! decides how to proceed.

pub mod client;
pub mod error;

pub use client::ServiceClient;
pub use error::ClientError;
