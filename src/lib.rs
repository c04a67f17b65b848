//! A command-line scaffold for launching a fleet of remote compute workers.
//!
//! Users describe a fleet (worker count, base directory, code archive, git
//! branch and deploy key, per-worker command template) either directly on
//! the command line or through a saved JSON configuration, and `fleetrun`
//! resolves that description into a normalized run plan. The remote
//! transport that would consume the plan is intentionally left to a
//! separate component; this crate ends at the plan boundary.

pub mod archive;
pub mod cmd;
pub mod config;
pub mod plan;

/////////////////////////////////////////////////////////////////////////////
// Command templates
/////////////////////////////////////////////////////////////////////////////

/// The placeholder substituted with a worker's index.
pub const INDEX_PLACEHOLDER: &str = "{}";

/// Render a command template for the worker at `index`.
///
/// Every `{}` in the template is replaced with the zero-based worker
/// index, so `"echo {}"` renders to `"echo 4"` on worker 4. A template
/// without placeholders renders identically on every worker.
///
/// # Example
///
/// ```
/// use fleetrun::render_command;
///
/// assert_eq!(render_command("worker.sh {} of {}", 2), "worker.sh 2 of 2");
/// ```
pub fn render_command(template: &str, index: u32) -> String {
    template.replace(INDEX_PLACEHOLDER, &index.to_string())
}
