//! The interactive line-driven shell

use super::command::{self, HELP, ReplCommand};
use super::prompts::{DialoguerPrompt, prompt_command, prompt_confirmation};
use super::render;
use crate::config::Config;
use crate::dirty_form::{DirtyFormContext, DirtyFormMarker, UNSAVED_CHANGES_PROMPT};
use crate::fetch::{ErrorKind, FrameFetcher};
use crate::history::SessionHistory;
use crate::navigation::{HistoryMode, TransitionKind};
use crate::overlay::{OnClose, OverlayRenderer};
use crate::shell::{Shell, ShellUpdate};
use anyhow::Result;
use colored::*;
use std::sync::Arc;

struct Repl {
    shell: Shell,

    /// Stand-in for a form mounted in the main view
    primary_form: Option<DirtyFormMarker>,

    /// Stand-in for a form mounted in the overlay
    overlay_form: Option<DirtyFormMarker>,
}

/// Open `start_path` and read commands until `quit`
pub async fn run(fetcher: Arc<dyn FrameFetcher>, base_url: &str, start_path: &str) -> Result<()> {
    let mut shell = Shell::new(fetcher, Config::default(), DialoguerPrompt);
    let base_url = base_url.to_string();
    shell.set_server_error_listener(move |kind| {
        if kind == ErrorKind::Network {
            println!("{} is the service at {} running?", "hint:".bright_yellow().bold(), base_url);
        }
    });

    let mut repl = Repl {
        shell,
        primary_form: None,
        overlay_form: None,
    };
    repl.shell.navigate(start_path, HistoryMode::Push);
    repl.settle().await;

    println!("{}", "Type 'help' for commands.".dimmed());
    loop {
        let line = prompt_command(&repl.location())?;
        let command = match command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{} {}", "✗".bright_red().bold(), e);
                continue;
            }
        };

        if command == ReplCommand::Quit {
            if repl.shell.should_block_unload() && !prompt_confirmation(UNSAVED_CHANGES_PROMPT, false)? {
                continue;
            }
            break;
        }
        repl.execute(command)?;
        repl.settle().await;
    }

    log::info!("Leaving bridge-shell");
    Ok(())
}

impl Repl {
    fn location(&self) -> String {
        let mut location = self.shell.navigation().current_path().unwrap_or("(nowhere)").to_string();
        if let Some(path) = self.shell.overlay().and_then(|state| state.controller().current_path()) {
            location.push_str(&format!(" [{}]", path));
        }
        if self.shell.should_block_unload() {
            location.push('*');
        }
        location
    }

    fn execute(&mut self, command: ReplCommand) -> Result<()> {
        match command {
            ReplCommand::Go(path) => {
                if !self.shell.follow_link(path) {
                    println!("{}", "Staying on this page.".dimmed());
                }
            }
            ReplCommand::Submit { path, fields } => self.shell.submit_form(path, fields),
            ReplCommand::Refresh => {
                if !self.shell.refresh_props() {
                    println!("{}", "Nothing to refresh yet.".dimmed());
                }
            }
            ReplCommand::Replace(path) => self.shell.replace_path(path),
            ReplCommand::Back => {
                if !self.shell.history().is_some_and(SessionHistory::can_go_back) {
                    println!("{}", "No previous page.".dimmed());
                } else if !self.shell.back() {
                    println!("{}", "Staying on this page.".dimmed());
                }
            }
            ReplCommand::Forward => {
                if !self.shell.history().is_some_and(SessionHistory::can_go_forward) {
                    println!("{}", "No next page.".dimmed());
                } else if !self.shell.forward() {
                    println!("{}", "Staying on this page.".dimmed());
                }
            }
            ReplCommand::Overlay(path) => {
                let renderer: OverlayRenderer = Box::new(render::overlay_text);
                let on_close: OnClose = Box::new(|| println!("{} Overlay closed", "✓".bright_green().bold()));
                self.shell.open_overlay(path, renderer, Some(on_close));
            }
            ReplCommand::OverlayGo(path) => {
                if self.shell.overlay().is_none() {
                    println!("{}", "No overlay is open.".dimmed());
                } else if !self.shell.overlay_follow_link(path) {
                    println!("{}", "Staying on this overlay page.".dimmed());
                }
            }
            ReplCommand::Close => {
                if self.shell.overlay().is_none() {
                    println!("{}", "No overlay is open.".dimmed());
                } else if self.shell.request_overlay_close() {
                    // No exit transition to wait for in a terminal
                    self.shell.complete_overlay_close();
                    self.overlay_form = None;
                } else {
                    println!("{}", "Keeping the overlay open.".dimmed());
                }
            }
            ReplCommand::Dirty(dirty) => {
                let context = self.shell.primary_form_context();
                mark_form(&mut self.primary_form, context, dirty)?;
            }
            ReplCommand::OverlayDirty(dirty) => match self.shell.overlay_form_context() {
                Some(context) => mark_form(&mut self.overlay_form, context, dirty)?,
                None => println!("{}", "No overlay is open.".dimmed()),
            },
            ReplCommand::Show => self.print_page(),
            ReplCommand::Help => println!("{}", HELP),
            ReplCommand::Quit => {}
        }
        Ok(())
    }

    async fn settle(&mut self) {
        let updates = self.shell.settle().await;
        let mut changed = false;

        for update in updates {
            log::debug!("Shell update: {:?}", update);
            match update {
                ShellUpdate::Navigated { kind, .. } => {
                    if kind == TransitionKind::NewView {
                        // The page that owned the form is gone
                        self.primary_form = None;
                    }
                    changed = true;
                }
                ShellUpdate::OverlayOpened { .. } => {
                    self.overlay_form = None;
                    changed = true;
                }
                ShellUpdate::OverlayCloseRequested(_) => {
                    self.shell.complete_overlay_close();
                    changed = true;
                }
                ShellUpdate::Redirected { path } => {
                    println!("{} {}", "→ redirected to".dimmed(), path);
                }
                ShellUpdate::Reloading { path } => {
                    println!("{} {}", "↻ reloading".dimmed(), path);
                }
                ShellUpdate::OverlayOpenCancelled => {
                    println!("{}", "The overlay was not opened.".dimmed());
                }
                ShellUpdate::OverlayNavigated { .. } | ShellUpdate::Failed(_) => changed = true,
                ShellUpdate::Discarded | ShellUpdate::Ignored => {}
            }
        }

        if self.shell.overlay().is_none() {
            self.overlay_form = None;
        }
        if changed {
            self.print_page();
        }
    }

    fn print_page(&self) {
        match self.shell.current_frame() {
            Some(frame) => print!("{}", render::frame_text(frame)),
            None => println!("{}", "(no page loaded)".dimmed()),
        }
        if let Some(text) = self.shell.overlay().and_then(|state| state.render()) {
            print!("{}", text);
        }
        for message in self.shell.messages().iter() {
            println!("{}", render::message_line(message));
        }
    }
}

fn mark_form(slot: &mut Option<DirtyFormMarker>, context: DirtyFormContext, dirty: bool) -> Result<()> {
    if slot.is_none() {
        *slot = Some(context.register()?);
    }
    if let Some(marker) = slot.as_ref() {
        marker.set_dirty(dirty);
    }
    Ok(())
}
