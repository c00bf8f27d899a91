use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bridge-shell")]
#[command(about = "Browse a server-rendered application from the terminal")]
#[command(version)]
pub struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Origin of the rendering service, overrides the settings file
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Page to open first
    #[arg(default_value = "/")]
    pub path: String,
}
