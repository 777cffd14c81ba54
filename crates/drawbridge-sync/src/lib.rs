//! Synchronization core: the message channel abstraction, the sandbox-side
//! relay, and the controller that keeps a host document and a sandboxed
//! drawing surface consistent.

pub mod channel;
pub mod collab;
pub mod export;
pub mod instance;
pub mod relay;

pub use channel::{channel_pair, ChannelEndpoint};
pub use collab::{Collaborators, CommandRunner, Notifier, OpenRequester, SaveRequester};
pub use instance::{Reply, SyncInstance, SyncNotification, SyncState};
pub use relay::{Relay, RelayHandle};
