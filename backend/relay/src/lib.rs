//! `linkdrop-relay`: the link registry and everything that reads from it:
//! the access gate, deep-link resolution and broadcast fan-out.

pub mod broadcast;
pub mod directory;
pub mod gate;
pub mod link;
pub mod progress;
pub mod registry;
pub mod resolver;

pub use broadcast::{BroadcastPolicy, BroadcastReport, BroadcastTicket, Broadcaster, Outcome};
pub use directory::RecipientDirectory;
pub use gate::{AccessGate, GateDecision, DEFAULT_ORACLE_TIMEOUT};
pub use link::LinkBuilder;
pub use progress::{ProgressReporter, ProgressSnapshot};
pub use registry::{Registry, RegistryStats};
pub use resolver::{LinkResolver, Resolution};
