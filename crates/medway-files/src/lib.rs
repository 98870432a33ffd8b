//! Uploaded-document bookkeeping for the conversation core.
//!
//! Uploads land in a Processing state at the file store and settle
//! asynchronously. The tracker keeps a local cache of document states,
//! and the poller refreshes that cache on a fixed interval for exactly as
//! long as any document is still pending.

pub mod poller;
pub mod store;

pub use poller::UploadPoller;
pub use store::UploadTracker;
