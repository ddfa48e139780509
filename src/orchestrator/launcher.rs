//! Launch shapes for the two well-known process roles.
//!
//! The application server runs under uvicorn with reload patterns derived
//! from the caller's glob set; the asset watcher runs the external build
//! tool in watch-forever mode with an optional rebuild callback attached
//! to its output file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::Result;
use super::process::{ManagedProcess, Orchestrator, SpawnSpec};
use super::shim;
use super::watch::WatchCallback;
use crate::constants::{
    APP_SYMBOL, RELOAD_EXCLUDES, RELOAD_ROUTE, ROLE_ASSET_WATCHER, ROLE_SERVER,
};

impl Orchestrator {
    /// Launch the application server role.
    ///
    /// Builds the uvicorn command for `entry_file` with reload-include
    /// patterns from `watch_patterns` and the fixed reload-exclude set
    /// for generated artifacts. With `hot_reload`, a shim module is
    /// synthesized first and the server is pointed at it, with the shim's
    /// directory added to the module search path; otherwise the server
    /// imports the entry module directly.
    ///
    /// # Errors
    ///
    /// Returns an error if the shim cannot be written or the server
    /// process fails to spawn.
    pub fn launch_application_server(
        &self,
        entry_file: &Path,
        port: u16,
        watch_patterns: &[String],
        hot_reload: bool,
        debug: bool,
    ) -> Result<Arc<ManagedProcess>> {
        let entry_module = module_name(entry_file);
        let entry_dir = entry_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        let module = if hot_reload {
            shim::write_shim(entry_file, RELOAD_ROUTE)?;
            shim::shim_module_name(entry_file, std::process::id())
        } else {
            entry_module
        };

        let mut spec = SpawnSpec::new(
            ROLE_SERVER,
            server_command(&module, port, watch_patterns, debug),
        )
        .passthrough(true);

        if hot_reload {
            // The spawned server must resolve both the shim (temp dir)
            // and the real entry module (its own directory).
            spec = spec.env(
                "PYTHONPATH",
                search_path_with(&[std::env::temp_dir(), entry_dir]),
            );
        }

        self.start(spec)
    }

    /// Launch the asset watcher role.
    ///
    /// Runs `build_binary` in watch-forever mode from `project_root`,
    /// rebuilding `output_file` from `input_file`. When `on_rebuild` is
    /// supplied, a file watcher on the output fires it for every build
    /// the tool completes. A zero exit from this role is a finished
    /// one-shot build, not a failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the build tool fails to spawn.
    pub fn launch_asset_watcher(
        &self,
        build_binary: &Path,
        input_file: &Path,
        output_file: &Path,
        project_root: &Path,
        on_rebuild: Option<WatchCallback>,
    ) -> Result<Arc<ManagedProcess>> {
        let spec = SpawnSpec::new(
            ROLE_ASSET_WATCHER,
            asset_command(build_binary, input_file, output_file),
        )
        .working_dir(project_root)
        .zero_exit_ok(true);

        let process = self.start(spec)?;

        if let Some(callback) = on_rebuild {
            self.watch(output_file.to_path_buf(), callback);
        }
        Ok(process)
    }
}

/// uvicorn invocation for the server role.
fn server_command(module: &str, port: u16, watch_patterns: &[String], debug: bool) -> Vec<String> {
    let mut cmd = vec![
        "uvicorn".to_string(),
        format!("{module}:{APP_SYMBOL}"),
        "--host".to_string(),
        "127.0.0.1".to_string(),
        "--port".to_string(),
        port.to_string(),
        "--reload".to_string(),
    ];
    for pattern in watch_patterns {
        cmd.push("--reload-include".to_string());
        cmd.push(pattern.clone());
    }
    for pattern in RELOAD_EXCLUDES {
        cmd.push("--reload-exclude".to_string());
        cmd.push((*pattern).to_string());
    }
    cmd.push("--log-level".to_string());
    cmd.push(if debug { "debug" } else { "info" }.to_string());
    cmd
}

/// Watch-forever invocation of the asset build tool.
fn asset_command(build_binary: &Path, input_file: &Path, output_file: &Path) -> Vec<String> {
    vec![
        build_binary.display().to_string(),
        "-i".to_string(),
        input_file.display().to_string(),
        "-o".to_string(),
        output_file.display().to_string(),
        "--watch".to_string(),
    ]
}

/// Importable module name of an entry file (its stem).
fn module_name(entry_file: &Path) -> String {
    entry_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".to_string())
}

/// Join the given directories ahead of any inherited PYTHONPATH, using
/// the platform's path-list separator.
fn search_path_with(dirs: &[PathBuf]) -> String {
    let mut paths: Vec<PathBuf> = dirs.to_vec();
    if let Some(existing) = std::env::var_os("PYTHONPATH") {
        paths.extend(std::env::split_paths(&existing));
    }
    std::env::join_paths(paths)
        .map(|joined| joined.to_string_lossy().into_owned())
        .unwrap_or_else(|_| dirs[0].display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_command_includes_reload_patterns() {
        let cmd = server_command("main", 8000, &["*.py".to_string()], false);
        assert_eq!(cmd[0], "uvicorn");
        assert_eq!(cmd[1], "main:app");
        assert!(cmd.windows(2).any(|w| w == ["--port", "8000"]));
        assert!(cmd.contains(&"--reload".to_string()));
        assert!(cmd.windows(2).any(|w| w == ["--reload-include", "*.py"]));
        // Generated artifacts never trigger a server reload.
        for excluded in RELOAD_EXCLUDES {
            assert!(
                cmd.windows(2)
                    .any(|w| w[0] == "--reload-exclude" && w[1] == *excluded),
                "missing exclude {excluded}"
            );
        }
        assert!(cmd.windows(2).any(|w| w == ["--log-level", "info"]));
    }

    #[test]
    fn debug_flag_raises_log_level() {
        let cmd = server_command("main", 8000, &[], true);
        assert!(cmd.windows(2).any(|w| w == ["--log-level", "debug"]));
    }

    #[test]
    fn asset_command_watches_forever() {
        let cmd = asset_command(
            Path::new("tailwindcss"),
            Path::new("assets/input.css"),
            Path::new("static/build.css"),
        );
        assert_eq!(
            cmd,
            vec![
                "tailwindcss",
                "-i",
                "assets/input.css",
                "-o",
                "static/build.css",
                "--watch"
            ]
        );
    }

    #[test]
    fn module_name_is_entry_stem() {
        assert_eq!(module_name(Path::new("src/app/main.py")), "main");
        assert_eq!(module_name(Path::new("site.py")), "site");
    }

    #[test]
    fn search_path_leads_with_given_dirs() {
        let joined = search_path_with(&[PathBuf::from("/tmp/devloop"), PathBuf::from("src")]);
        assert!(joined.starts_with("/tmp/devloop"));
        assert!(joined.contains("src"));
    }
}
