//! Commands understood by the interactive shell

use anyhow::{Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Go(String),
    Submit { path: String, fields: Vec<(String, String)> },
    Refresh,
    Replace(String),
    Back,
    Forward,
    Overlay(String),
    OverlayGo(String),
    Close,
    Dirty(bool),
    OverlayDirty(bool),
    Show,
    Help,
    Quit,
}

pub const HELP: &str = "\
go PATH              follow a link in the main view
submit PATH k=v...   submit a form
refresh              reload the current page's props
replace PATH         load PATH in place of the current page
back | forward       move through history
overlay PATH         open PATH in an overlay
overlay-go PATH      follow a link inside the overlay
close                close the overlay
dirty on|off         mark the main view's form as (un)edited
overlay-dirty on|off mark the overlay's form as (un)edited
show                 print the current page
quit";

/// Parse one input line; `Ok(None)` for a blank line
pub fn parse(line: &str) -> Result<Option<ReplCommand>> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let command = match name {
        "go" => ReplCommand::Go(single_path(name, &rest)?),
        "submit" => {
            let (path, pairs) = rest.split_first().context("usage: submit PATH k=v...")?;
            let fields = pairs.iter().map(|pair| parse_field(pair)).collect::<Result<Vec<_>>>()?;
            ReplCommand::Submit {
                path: path.to_string(),
                fields,
            }
        }
        "refresh" => ReplCommand::Refresh,
        "replace" => ReplCommand::Replace(single_path(name, &rest)?),
        "back" => ReplCommand::Back,
        "forward" => ReplCommand::Forward,
        "overlay" => ReplCommand::Overlay(single_path(name, &rest)?),
        "overlay-go" => ReplCommand::OverlayGo(single_path(name, &rest)?),
        "close" => ReplCommand::Close,
        "dirty" => ReplCommand::Dirty(on_off(name, &rest)?),
        "overlay-dirty" => ReplCommand::OverlayDirty(on_off(name, &rest)?),
        "show" => ReplCommand::Show,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        other => anyhow::bail!("Unknown command '{}', try 'help'", other),
    };
    Ok(Some(command))
}

fn single_path(command: &str, args: &[&str]) -> Result<String> {
    match args {
        [path] => Ok(path.to_string()),
        _ => anyhow::bail!("usage: {} PATH", command),
    }
}

fn on_off(command: &str, args: &[&str]) -> Result<bool> {
    match args {
        ["on"] => Ok(true),
        ["off"] => Ok(false),
        _ => anyhow::bail!("usage: {} on|off", command),
    }
}

fn parse_field(pair: &str) -> Result<(String, String)> {
    let (key, value) = pair
        .split_once('=')
        .with_context(|| format!("Expected key=value, got '{}'", pair))?;
    Ok((key.to_string(), value.to_string()))
}
