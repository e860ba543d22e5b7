use std::path::Path;
use std::path::PathBuf;
use std::process::Command;

use derive_more::Deref;
use serde::Deserialize;
use serde::Serialize;

use crate::IdegenError;
use crate::IdegenResult;

/// Substring every usable idedata dump contains.
pub const IDEDATA_MARKER: &str = "\"includes\":";

/// The idedata object printed by `platformio run --target idedata`.
///
/// Held as the parsed JSON object so every key reaches the templates with the
/// shape PlatformIO gave it. Older releases print `includes` as a flat list of
/// paths, newer ones as an object of path groups (`build`, `compatlib`,
/// `toolchain`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Deref)]
#[serde(transparent)]
pub struct BuildMetadata(serde_json::Map<String, serde_json::Value>);

impl Default for BuildMetadata {
	/// No defines, no include paths and no tool paths.
	fn default() -> Self {
		let mut data = serde_json::Map::new();
		data.insert("defines".to_string(), serde_json::Value::Array(Vec::new()));
		data.insert("includes".to_string(), serde_json::Value::Array(Vec::new()));
		data.insert("cxx_path".to_string(), serde_json::Value::Null);
		data.insert("prog_path".to_string(), serde_json::Value::Null);
		Self(data)
	}
}

/// Captured result of one build tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
	/// Display name of the program that was run.
	pub program: String,
	/// `None` when the process was terminated without an exit code.
	pub exit_code: Option<i32>,
	pub stdout: String,
	pub stderr: String,
}

impl BuildOutput {
	/// Stdout followed by stderr, as shown to the user on failure.
	pub fn combined(&self) -> String {
		if self.stderr.is_empty() {
			return self.stdout.clone();
		}

		let mut combined = self.stdout.clone();
		if !combined.is_empty() && !combined.ends_with('\n') {
			combined.push('\n');
		}
		combined.push_str(&self.stderr);
		combined
	}
}

/// Runs the build tool's IDE data dump for a project environment.
pub trait BuildRunner {
	fn run_idedata(&self, project_dir: &Path, env_name: &str) -> IdegenResult<BuildOutput>;

	/// The executable templates should invoke for build tasks.
	fn program(&self) -> &Path;
}

impl<R: BuildRunner + ?Sized> BuildRunner for &R {
	fn run_idedata(&self, project_dir: &Path, env_name: &str) -> IdegenResult<BuildOutput> {
		(**self).run_idedata(project_dir, env_name)
	}

	fn program(&self) -> &Path {
		(**self).program()
	}
}

/// [`BuildRunner`] that spawns PlatformIO Core as a subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformioRunner {
	program: PathBuf,
}

impl PlatformioRunner {
	pub fn new(program: impl Into<PathBuf>) -> Self {
		Self {
			program: program.into(),
		}
	}
}

impl BuildRunner for PlatformioRunner {
	fn run_idedata(&self, project_dir: &Path, env_name: &str) -> IdegenResult<BuildOutput> {
		let program = self.program.display().to_string();
		let project_dir = std::path::absolute(project_dir)?;
		let args = idedata_args(&project_dir, env_name);
		tracing::debug!(program = %program, ?args, "running build tool");

		let output = Command::new(&self.program)
			.args(&args)
			.current_dir(&project_dir)
			.output()
			.map_err(|e| {
				IdegenError::BuildToolSpawn {
					program: program.clone(),
					reason: e.to_string(),
				}
			})?;

		tracing::debug!(status = %output.status, "build tool finished");

		Ok(BuildOutput {
			program,
			exit_code: output.status.code(),
			stdout: String::from_utf8_lossy(&output.stdout).to_string(),
			stderr: String::from_utf8_lossy(&output.stderr).to_string(),
		})
	}

	fn program(&self) -> &Path {
		&self.program
	}
}

/// Arguments for `platformio run` that dump IDE data for one environment.
pub fn idedata_args(project_dir: &Path, env_name: &str) -> Vec<String> {
	vec![
		"run".to_string(),
		"--project-dir".to_string(),
		project_dir.display().to_string(),
		"--environment".to_string(),
		env_name.to_string(),
		"--target".to_string(),
		"idedata".to_string(),
	]
}

/// Turn a captured build run into [`BuildMetadata`].
///
/// A non-zero exit code alone is not fatal: PlatformIO reports build
/// failures through its exit code and may still have printed the data. The
/// run fails when the process died without an exit code, or when the output
/// never mentions `"includes":`. Output that mentions it without a parsable
/// idedata line yields the empty shape.
pub fn extract_build_data(output: &BuildOutput) -> IdegenResult<BuildMetadata> {
	let Some(exit_code) = output.exit_code else {
		return Err(IdegenError::BuildInvocation {
			program: output.program.clone(),
			reason: "terminated by signal".to_string(),
		});
	};

	let failed_code = (exit_code != 0).then_some(exit_code);
	if !output.stdout.contains(IDEDATA_MARKER) {
		return Err(IdegenError::MalformedBuildOutput {
			output: output.combined(),
			exit_code: failed_code,
		});
	}

	let Some(data) = scan_idedata_lines(&output.stdout) else {
		tracing::warn!(
			program = %output.program,
			"no idedata line in build output, using empty build data"
		);
		return Ok(BuildMetadata::default());
	};

	if let Some(code) = failed_code {
		tracing::warn!(code, "build tool exited with an error but produced IDE data");
	}

	Ok(data)
}

/// Find the idedata object in free-form build output.
///
/// This is a compatibility shim over log-style output, not a protocol: every
/// trimmed line that starts with `{"`, ends with `}` and parses as a JSON
/// object is a candidate, and the last candidate wins. Lines that only look
/// like JSON are skipped.
pub fn scan_idedata_lines(output: &str) -> Option<BuildMetadata> {
	let mut found = None;

	for line in output.lines().map(str::trim) {
		if !(line.starts_with("{\"") && line.ends_with('}')) {
			continue;
		}

		match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(line) {
			Ok(object) => found = Some(BuildMetadata(object)),
			Err(e) => tracing::debug!(error = %e, "skipping JSON-shaped line"),
		}
	}

	found
}
