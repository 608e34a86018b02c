//! Dashboard views

pub mod job;
pub mod settings;

pub use job::render_job_view;
pub use settings::render_settings_view;
