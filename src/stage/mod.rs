//! Stage reconciliation: diffing and syncing the deploy root
//!
//! The finished deploy root is compared against a snapshot of the remote
//! listing (`diff`) and the resulting change sets are applied through the
//! transport primitives (`sync`). Listing snapshots are explicit values, not
//! ambient state, so diffing stays pure and testable without a live remote.

mod diff;
mod memory;
mod sync;
mod transport;

pub use diff::{diff_deploy_root, DiffOptions, DiffResult};
pub use memory::MemoryStage;
pub use sync::{SyncExecutor, SyncOutcome};
pub use transport::{RemoteEntry, StageTransport, TransportError};
