//! Hot-reload shim synthesis.
//!
//! The application server is pointed at a generated wrapper module
//! instead of the real entry point, so reload notifications flow through
//! the orchestrator's own route rather than the target framework's
//! built-in one. The artifact is written to the shared OS temp directory
//! under a name unique per (entry-file stem, orchestrator pid), read once
//! by the spawned server at start-up, and never mutated afterwards; its
//! lifetime is tied to the temp area's own cleanup policy.

use std::path::{Path, PathBuf};

use super::error::{Error, Result};
use crate::constants::APP_SYMBOL;

/// Render the shim source for an application imported from `module`.
///
/// The generated module imports the application object, drops any
/// pre-existing route on the reserved reload path, installs the
/// orchestrator's reload-notification route, and re-exports the object
/// under the symbol the launcher expects. Patching is wrapped so a
/// failure prints a warning and the unpatched application still starts.
pub fn render_shim(module: &str, reload_route: &str) -> String {
    format!(
        r#""""Generated development wrapper. Do not edit."""

import sys
from importlib import import_module

_target = import_module("{module}")
{app} = getattr(_target, "{app}")

try:
    _router = getattr({app}, "router", {app})
    _routes = getattr(_router, "routes", None)
    if _routes is not None:
        _kept = [r for r in _routes if getattr(r, "path", None) != "{route}"]
        del _routes[:]
        _routes.extend(_kept)

    from starlette.responses import Response
    from starlette.routing import Route

    async def _live_reload(request):
        return Response(status_code=204, headers={{"cache-control": "no-store"}})

    if _routes is not None:
        _routes.append(Route("{route}", _live_reload, methods=["GET"]))
except Exception as exc:
    print(f"devloop: live-reload patch failed: {{exc}}", file=sys.stderr)
"#,
        module = module,
        app = APP_SYMBOL,
        route = reload_route,
    )
}

/// File name for the shim artifact: unique per entry stem and pid so
/// concurrent sessions for different applications, or the same
/// application started twice, never collide.
pub fn shim_file_name(entry_file: &Path, pid: u32) -> String {
    let stem = entry_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "app".to_string());
    format!("{}_devloop_{pid}.py", sanitize_stem(&stem))
}

/// Importable module name of the shim (the file name without `.py`).
pub fn shim_module_name(entry_file: &Path, pid: u32) -> String {
    let mut name = shim_file_name(entry_file, pid);
    name.truncate(name.len() - ".py".len());
    name
}

/// Map the entry stem to a valid Python identifier fragment.
fn sanitize_stem(stem: &str) -> String {
    let mut out: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Write the shim for `entry_file` into the shared temp directory and
/// return its path.
///
/// # Errors
///
/// Returns an error only if the artifact cannot be written; patch
/// problems are handled inside the generated module at server start-up.
pub fn write_shim(entry_file: &Path, reload_route: &str) -> Result<PathBuf> {
    let module = entry_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| {
            Error::InvalidLaunch(format!("entry file has no stem: {}", entry_file.display()))
        })?;

    let path = std::env::temp_dir().join(shim_file_name(entry_file, std::process::id()));
    std::fs::write(&path, render_shim(&module, reload_route))
        .map_err(|e| Error::io(format!("writing hot-reload shim {}", path.display()), e))?;

    tracing::debug!(shim = %path.display(), entry = %entry_file.display(), "wrote hot-reload shim");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::RELOAD_ROUTE;
    use proptest::prelude::*;

    #[test]
    fn shim_imports_filters_and_reexports() {
        let source = render_shim("main", RELOAD_ROUTE);
        assert!(source.contains(r#"import_module("main")"#));
        assert!(source.contains(r#"app = getattr(_target, "app")"#));
        assert!(source.contains(&format!(r#"getattr(r, "path", None) != "{RELOAD_ROUTE}""#)));
        assert!(source.contains(&format!(r#"_routes.append(Route("{RELOAD_ROUTE}""#)));
        assert!(source.contains("cache-control"));
    }

    #[test]
    fn file_name_embeds_stem_and_pid() {
        let name = shim_file_name(Path::new("src/main.py"), 4242);
        assert_eq!(name, "main_devloop_4242.py");
    }

    #[test]
    fn file_names_differ_across_entries_and_pids() {
        let a = shim_file_name(Path::new("app.py"), 100);
        let b = shim_file_name(Path::new("site.py"), 100);
        let c = shim_file_name(Path::new("app.py"), 101);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn sanitizer_handles_awkward_stems() {
        assert_eq!(sanitize_stem("my-app.v2"), "my_app_v2");
        assert_eq!(sanitize_stem("2fast"), "_2fast");
        assert_eq!(sanitize_stem(""), "_");
    }

    #[test]
    fn write_shim_creates_artifact() {
        let path = write_shim(Path::new("main.py"), RELOAD_ROUTE).unwrap();
        let source = std::fs::read_to_string(&path).unwrap();
        assert!(source.contains(r#"import_module("main")"#));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn module_name_matches_file_name() {
        let entry = Path::new("main.py");
        assert_eq!(
            format!("{}.py", shim_module_name(entry, 7)),
            shim_file_name(entry, 7)
        );
    }

    proptest! {
        /// Shim file names are always single-component and unique per
        /// (stem, pid) pair.
        #[test]
        fn file_name_is_single_component(stem in "[a-zA-Z0-9._ -]{1,32}", pid in 1u32..100_000) {
            let name = shim_file_name(Path::new(&format!("{stem}.py")), pid);
            prop_assert!(!name.contains('/'));
            prop_assert!(!name.contains('\\'));
            let suffix = format!("_devloop_{}.py", pid);
            prop_assert!(name.ends_with(&suffix));
        }

        #[test]
        fn distinct_pids_never_collide(stem in "[a-z]{1,16}", a in 1u32..50_000, b in 50_000u32..100_000) {
            let entry = format!("{stem}.py");
            prop_assert_ne!(
                shim_file_name(Path::new(&entry), a),
                shim_file_name(Path::new(&entry), b)
            );
        }
    }
}
