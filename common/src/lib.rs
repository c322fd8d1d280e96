//! Shared engine for the Mail.ru Cloud WebDAV uploader.
//!
//! The crate is split along the same seams as the tool itself: pure path
//! and pattern helpers, the per-file decision function, the WebDAV
//! protocol adapter, and the sync engine that drives them.

#[macro_use]
extern crate lazy_static;

pub mod config;
pub mod decision;
pub mod exclude;
pub mod logging;
pub mod path_utils;
pub mod sync;
pub mod webdav;

pub use config::{AppConfig, CompareMode};
pub use decision::{decide_file_action, FileAction, FileDecision, LocalFileInfo};
pub use exclude::ExcludeRules;
pub use sync::{run_sync, SyncStats};
pub use webdav::{parse_base_url, BaseUrl, Credentials, RemoteItemInfo, WebDavClient};
