//! Dashboard UI Module
//!
//! The desktop window: image selection, job progress, result text and
//! server settings.

pub mod app;
pub mod preview;
pub mod state;
pub mod theme;
pub mod views;
pub mod components;

pub use app::{run_dashboard, DashboardApp};
pub use state::{DashboardState, DashboardView};
