//! # haven-escalate
//!
//! The human-handoff workflow: pick a resource, start a warm transfer, and
//! track its status until the user is connected.
//!
//! Directory and transfer-client calls are treated as failing remote calls.
//! Every failure is caught at this boundary and degraded to the built-in
//! static resource set — escalation never propagates an infrastructure
//! error into the conversation flow.
//!
//! Transfer status is monotonic: once the coordinator has observed a status,
//! a remote report that ranks below it is discarded, and terminal states
//! stick.

mod coordinator;
mod directory;
mod error;
mod transfer;

pub use coordinator::{EscalationConfig, EscalationCoordinator};
pub use directory::{ResourceDirectory, StaticDirectory};
pub use error::EscalationError;
pub use transfer::{MockTransferClient, TransferContext, WarmTransferClient};
