//! Prompt templates and project seeding seam

use std::io;
use std::path::Path;

/// Supplies the two session prompts and seeds fresh projects.
///
/// The loop stays free of template text; binaries embed their own copies
/// and hand them over through this trait. Sources are shared by reference
/// across the loop future, so they must be `Send + Sync`.
pub trait PromptSource: Send + Sync {
    /// Prompt for the very first session of a project
    fn initializer_prompt(&self) -> String;

    /// Prompt for every later session
    fn continuation_prompt(&self) -> String;

    /// Copy spec files into a fresh project directory.
    ///
    /// Called once, before the first turn, and only when no progress
    /// artifact exists yet. Files already present are left untouched.
    fn seed_project(&self, project_dir: &Path) -> io::Result<()>;
}
