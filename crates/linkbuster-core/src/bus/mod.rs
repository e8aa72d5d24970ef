//! Message bus between the core and observing surfaces.
//!
//! Two directions:
//! - requests from a surface to the core ([`Request`]), answered either
//!   immediately ([`Reply::Ready`]) or later through an explicit pending
//!   handle ([`Reply::Pending`]);
//! - surface-bound messages from the core ([`SurfaceMessage`]), broadcast to
//!   whoever is subscribed.
//!
//! The bus only transports values; it never mutates domain state. A missing
//! observer (dropped pending handle, no subscribers) is a no-op.

mod protocol;
mod surface;

pub use protocol::{
    pending, AckResponse, ConnectionResponse, FrameKind, NavigationOutcome, PendingResponse,
    PingResponse, Reply, Request, Responder, Response, ServiceState, StatusResponse,
};
pub use surface::{SurfaceBus, SurfaceMessage};
