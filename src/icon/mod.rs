/// Icon handling module
///
/// This module covers everything that touches a file's icon:
/// - PNG icon images and content fingerprints (picture.rs)
/// - The platform icon primitive and its sidecar backend (surface.rs)
/// - "Applied by this tool" markers (marker.rs)
/// - Clipboard image import (clipboard.rs)
/// - Single-file and batch apply/remove (service.rs)

pub mod clipboard;
pub mod marker;
pub mod picture;
pub mod service;
pub mod surface;

pub use marker::{MarkerStore, SidecarMarkers};
pub use picture::{Fingerprint, IconImage};
pub use service::{BatchProgress, BatchResult, IconService};
pub use surface::{IconSurface, SidecarIconSurface};
