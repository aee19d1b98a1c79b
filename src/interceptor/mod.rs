//! Interceptors: before/after hooks around every send and consume.
//!
//! ```text
//!   before(I1) ─▶ before(I2) ─▶ before(I3) ─▶ store write / handler
//!                                                     │
//!   after(I1)  ◀─ after(I2)  ◀─ after(I3)  ◀──────────┘
//! ```
//!
//! Cross-cutting context (tenant IDs, trace IDs) is carried explicitly in the
//! envelope headers: a before-send hook writes it and the matching
//! before-consume hook reads it on the other side.

mod chain;
#[allow(clippy::module_inception)]
mod interceptor;
mod log_interceptor;

pub(crate) use chain::Route;
pub use chain::InterceptorChain;
pub use interceptor::{Interceptor, InterceptorError, MessageContext};
pub use log_interceptor::LogInterceptor;
