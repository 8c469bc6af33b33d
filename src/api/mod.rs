//! Session-level API for the host app
//!
//! The host owns the render loop: it pushes GPS fixes through a
//! [`FixSink`](crate::hardware::FixSink), calls [`HuntSession::tick`] once per
//! frame and renders the returned [`CoinRenderState`]s.

pub mod session;
pub mod types;

pub use session::HuntSession;
pub use types::{CoinRenderState, FrameInput, SessionStatus};
