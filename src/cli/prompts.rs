use crate::dirty_form::ConfirmPrompt;
use anyhow::Result;
use dialoguer::{Input, Select};

/// Interactive confirmation prompt using arrow-key navigable selection
pub fn prompt_confirmation(prompt: &str, default_yes: bool) -> Result<bool> {
    let items = vec!["Yes", "No"];
    let default_index = if default_yes { 0 } else { 1 };

    let selection = Select::new()
        .with_prompt(prompt)
        .items(&items)
        .default(default_index)
        .interact()?;

    Ok(selection == 0)
}

/// Read one command line; an empty line is allowed
pub fn prompt_command(location: &str) -> Result<String> {
    let line = Input::<String>::new()
        .with_prompt(location)
        .allow_empty(true)
        .interact_text()?;
    Ok(line)
}

/// Asks before unsaved edits are thrown away. Defaults to "No"; a prompt
/// that cannot be shown counts as a refusal.
pub struct DialoguerPrompt;

impl ConfirmPrompt for DialoguerPrompt {
    fn confirm(&self, message: &str) -> bool {
        match prompt_confirmation(message, false) {
            Ok(confirmed) => confirmed,
            Err(e) => {
                log::warn!("Confirmation prompt failed: {}", e);
                false
            }
        }
    }
}
