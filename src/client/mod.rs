//! Client-side components: per-surface controls that act optimistically,
//! guard against overlapping requests, and reconcile with the server.
//!
//! Everything here is handed its collaborators explicitly. A typical
//! session builds one [`Session`], one [`ApiClient`] and one
//! [`NotificationSyncBus`] and passes clones of the `Arc`s to each control.

pub mod api;
pub mod bookmark;
pub mod error;
pub mod notifications;
pub mod optimistic;
pub mod reports;
pub mod session;
pub mod sync_bus;
pub mod transport;
pub mod vote;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ClientResult, EngagementApi, NotificationApi, ReportApi};
pub use bookmark::{BookmarkCache, BookmarkControl};
pub use error::{ClientError, ErrorCategory};
pub use notifications::NotificationIndicator;
pub use optimistic::{BusyFlag, BusyGuard, Optimistic};
pub use reports::{ReportComposer, ReportReviewer};
pub use session::{Session, SessionState, Viewer};
pub use sync_bus::{NotificationSyncBus, SyncSignal};
pub use transport::ApiClient;
pub use vote::VoteControl;
