//! # ucon-kernel: Usage session state machine
//!
//! A usage session walks `Initial → Requesting → {Denied | Accessing}` and
//! then `Accessing → {Revoked | End}`. Every other event is a protocol
//! violation and lands the session in `Error`.
//!
//! ## Key Principles
//!
//! - **No IO**: transitions never touch providers, clocks or threads
//! - **Total**: [`transition`] is defined for every state and event
//! - **Owned payload**: an `Accessing` session owns its [`AccessGrant`]; the
//!   grant's re-evaluation [`Schedule`] is cancelled when the grant is dropped
//!
//! ## Example
//!
//! ```
//! use ucon_kernel::{Event, StateKind, UsageSession};
//!
//! let mut session = UsageSession::new("alice/doc/read".into());
//! assert_eq!(session.feed(Event::TryAccess), StateKind::Requesting);
//! assert_eq!(session.feed(Event::DenyAccess), StateKind::Denied);
//! assert_eq!(session.feed(Event::TryAccess), StateKind::Error);
//! ```

mod session;
mod state;


pub use session::{UsageSession, transition};
pub use state::{AccessGrant, Event, Schedule, State, StateKind};
