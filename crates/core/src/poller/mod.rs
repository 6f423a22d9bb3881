//! Periodic polling of the broker's converging aggregates.
//!
//! [`Poller`] is the generic primitive: a guarded `Idle -> Polling ->
//! {Converged, Failed}` state machine that owns its schedule. The aggregate
//! pollers wrap it with a command, a decode step and a convergence predicate:
//!
//! - [`StatPoller`]: until `working == 0`, reporting every snapshot
//! - [`ShowPoller`]: until `activeclients == 0`
//! - [`TermlistPoller`]: until `activeclients == 0`, or not at all when no
//!   facets are requested

mod schedule;
mod show;
mod stat;
mod termlist;

pub use schedule::{PollLimits, Poller, PollerState};
pub use show::ShowPoller;
pub use stat::{ProgressCallback, StatPoller};
pub use termlist::TermlistPoller;
