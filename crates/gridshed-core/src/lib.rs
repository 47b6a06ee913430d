//! Domain layer between `gridshed-api` and the CLI.
//!
//! - **[`summary`]** — reduces a raw ensemble-inventory payload to an
//!   actionable [`InventorySummary`] (grid status + battery levels).
//! - **[`poller`]** — the poll-and-react loop: keeps the two-tier
//!   credential chain (cloud token → gateway session) valid through an
//!   explicit [`CredentialContext`], fetches, reduces, emits, and decides
//!   whether to trip the breakers.
//! - **[`error`]** — [`CoreError`], the single error type the poll cycle
//!   (the sole recovery boundary) sees.

pub mod error;
pub mod poller;
pub mod summary;

pub use error::CoreError;
pub use poller::{BreakerControl, CredentialContext, LogBreaker, Poller, SummarySink, TracingSink};
pub use summary::{reduce, GridStatus, InventorySummary};
