pub mod event;
pub mod log;
pub mod policy;
pub mod stats;

pub use event::{CallEvent, EventKey, unix_now};
pub use log::{EventLog, Subscription, SubscriptionId};
pub use policy::{AccessPolicy, PolicyError};
pub use stats::{StatInterval, StatSnapshot, StatWindow, StatsError, run_aggregator};
