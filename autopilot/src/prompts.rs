//! Embedded prompt templates and project seeding

use std::io;
use std::path::Path;

use agent_session_lib::PromptSource;

const INITIALIZER_PROMPT: &str = include_str!("../prompts/initializer_prompt.md");
const CODING_PROMPT: &str = include_str!("../prompts/coding_prompt.md");
const APP_SPEC: &str = include_str!("../prompts/app_spec.txt");
const APP_DETAILS: &str = include_str!("../prompts/app_details.md");

/// Prompt templates compiled into the binary
#[derive(Debug, Default)]
pub struct EmbeddedPrompts;

impl PromptSource for EmbeddedPrompts {
    fn initializer_prompt(&self) -> String {
        INITIALIZER_PROMPT.to_string()
    }

    fn continuation_prompt(&self) -> String {
        CODING_PROMPT.to_string()
    }

    fn seed_project(&self, project_dir: &Path) -> io::Result<()> {
        write_if_missing(project_dir, "app_spec.txt", APP_SPEC)?;
        write_if_missing(project_dir, "app_details.md", APP_DETAILS)?;
        Ok(())
    }
}

fn write_if_missing(project_dir: &Path, name: &str, contents: &str) -> io::Result<()> {
    let dest = project_dir.join(name);
    if dest.exists() {
        return Ok(());
    }
    std::fs::write(&dest, contents)?;
    println!("Copied {} to project directory", name);
    Ok(())
}
