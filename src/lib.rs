//! Custom file icons: scan folders, spot files whose icon differs from the
//! rest of their type, and apply or revert icons in bulk with undo and an
//! activity history.

pub mod config;
pub mod deeplink;
pub mod error;
pub mod icon;
pub mod scan;
pub mod state;
pub mod task;

pub use config::AppPaths;
pub use error::{AppError, AppResult, IconError};
pub use icon::{BatchProgress, BatchResult, IconImage, IconService};
pub use scan::{detect_inconsistencies, FolderScanner, Inconsistency};
pub use state::{AppState, OperationProgress};
