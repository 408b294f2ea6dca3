/// State management module
///
/// This module handles all application state, including:
/// - Shared records and closed enums (data.rs)
/// - JSON load/save policy (persist.rs)
/// - The icon library and its managed image files (library.rs)
/// - Undo snapshots (undo.rs)
/// - Activity history and the shared recent-icons list (activity.rs)
/// - Extension presets and tracked scan folders (presets.rs, folders.rs)
/// - The single owner that ties them together (app.rs)

pub mod activity;
pub mod app;
pub mod data;
pub mod folders;
pub mod library;
pub mod persist;
pub mod presets;
pub mod undo;

pub use app::{AppState, OperationProgress};
