//! `idegen_core` is the core library for the idegen project generator. It
//! reads a PlatformIO project's `platformio.ini`, asks PlatformIO for the
//! compiler data of one environment, and renders a directory of per-IDE
//! templates into the project.
//!
//! ## Processing Pipeline
//!
//! ```text
//! platformio.ini
//!   → ProjectConfig (sections, `[env]` inheritance, `extends`, `${…}` references)
//!   → EnvironmentSettings (options of the selected `[env:NAME]`)
//!   → BuildRunner (`platformio run --target idedata`) → BuildMetadata
//!   → TemplateVariables (environment → build data → derived facts)
//!   → templates/<ide>/**/*.tpl rendered with minijinja
//!   → files written below the project directory (existing `.gitignore` kept)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: the tool's own `idegen.toml` and the resolution of the
//!   template root and build tool.
//! - [`project_config`]: reading `platformio.ini`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use idegen_core::GenerationRequest;
//! use idegen_core::ProjectGenerator;
//! use idegen_core::config::ResolvedSettings;
//! use idegen_core::config::SettingsOverrides;
//! use std::path::Path;
//!
//! let root = Path::new(".");
//! let settings = ResolvedSettings::resolve(root, &SettingsOverrides::default()).unwrap();
//! let request = GenerationRequest::new(root, "vscode", "uno");
//! let generator = ProjectGenerator::with_settings(request, &settings).unwrap();
//! let report = generator.generate().unwrap();
//! println!("{} file(s) generated", report.files.len());
//! ```

pub use build_data::*;
pub use error::*;
pub use generator::*;
pub use project_config::*;
pub use templates::*;
pub use variables::*;

mod build_data;
pub mod config;
#[allow(unused_assignments)]
mod error;
mod generator;
pub mod project_config;
mod templates;
mod variables;

#[cfg(test)]
mod __fixtures;
