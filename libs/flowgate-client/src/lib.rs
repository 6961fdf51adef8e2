//! Client for the flowgate traffic-forwarding panel admin API.
//!
//! The panel speaks JSON over a versioned REST surface (`/api/v1/...`) and
//! wraps every response in a uniform `{code, msg, data}` envelope, code 0
//! meaning success. This crate provides:
//!
//! - [`PanelClient`] — the authenticated HTTP wrapper. Attaches the bearer
//!   token to every call except login itself, applies a fixed per-call
//!   timeout, and normalizes all failures (transport, HTTP status, business
//!   code) into either failure envelopes or [`PanelError`] values. Nothing
//!   panics past the client boundary.
//! - Session handling in two flavours: a login session that obtains a token
//!   from `/api/v1/user/login` and re-authenticates transparently when the
//!   cached token ages out, and a static pre-issued token for embedded
//!   deployments, which is cleared (with a one-shot notification hook) when
//!   the panel reports the session as expired.
//! - Typed endpoint methods for the panel resources: users, tunnels,
//!   user-tunnel bindings, forwards, speed limits and nodes.

mod client;
mod envelope;
mod error;
mod forwards;
mod nodes;
mod session;
mod tunnels;
mod units;
mod users;

pub use client::{Method, PanelAddress, PanelClient, PanelClientBuilder, resolve_base_url};
pub use envelope::Envelope;
pub use error::{is_session_expired, PanelError, SESSION_EXPIRED_PHRASES};
pub use forwards::{CreateForwardRequest, Forward};
pub use nodes::{Node, SpeedLimit};
pub use session::SessionConfig;
pub use tunnels::{
    find_binding, AssignTunnelRequest, Tunnel, TunnelAssignment, UpdateUserTunnelRequest,
    UserTunnel,
};
pub use units::{
    bytes_to_gb, days_to_ms, format_bytes, gb_to_bytes, generate_password, now_ms,
};
pub use users::{CreateUserRequest, PanelUser, UpdateUserRequest};
