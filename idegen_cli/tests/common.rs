#![allow(dead_code)]

use std::path::Path;
use std::path::PathBuf;

use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

pub const SAMPLE_IDEDATA: &str =
	r#"{"includes": ["/a/b"], "defines": ["UNIT_TEST"], "cxx_path": "/usr/bin/g++", "prog_path": null}"#;

pub fn idegen_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("idegen"));
	cmd.env("NO_COLOR", "1")
		.env_remove("IDEGEN_TEMPLATES_DIR")
		.env_remove("IDEGEN_BUILD_TOOL")
		.env_remove("IDEGEN_LOG");
	cmd
}

pub fn write_file(root: &Path, relative: &str, content: &str) {
	let path = root.join(relative);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("create_dir_all: {e}"));
	}
	std::fs::write(&path, content).unwrap_or_else(|e| panic!("write {}: {e}", path.display()));
}

pub fn read_file(root: &Path, relative: &str) -> String {
	let path = root.join(relative);
	std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
}

/// A project with two environments, `native` being the default.
pub fn sample_project(root: &Path) -> PathBuf {
	let project_dir = root.join("blink");
	write_file(
		&project_dir,
		"platformio.ini",
		"[platformio]\ndefault_envs = native\n\n[env:uno]\nplatform = atmelavr\n\n[env:native]\nplatform = native\n",
	);
	write_file(&project_dir, "src/main.cpp", "int main() { return 0; }\n");
	project_dir
}

pub fn sample_templates(root: &Path) -> PathBuf {
	let templates_dir = root.join("templates");
	write_file(&templates_dir, "vscode/.gitignore.tpl", ".pio\n");
	write_file(
		&templates_dir,
		"vscode/foo/bar.tpl",
		"{{ env_name }}:{% for include in includes %}{{ include }}{% endfor %}\n",
	);
	templates_dir
}

/// An executable shell script standing in for PlatformIO. Its positional
/// arguments are `run --project-dir DIR --environment ENV --target idedata`.
#[cfg(unix)]
pub fn fake_build_tool(root: &Path, body: &str) -> PathBuf {
	use std::os::unix::fs::PermissionsExt;

	let path = root.join("fake-platformio");
	std::fs::write(&path, format!("#!/bin/sh\n{body}\n"))
		.unwrap_or_else(|e| panic!("write fake build tool: {e}"));
	std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
		.unwrap_or_else(|e| panic!("chmod fake build tool: {e}"));
	path
}

#[cfg(unix)]
pub fn succeeding_build_tool(root: &Path) -> PathBuf {
	fake_build_tool(
		root,
		&format!("echo \"Processing $5 (platform: native)\"\necho '{SAMPLE_IDEDATA}'"),
	)
}
