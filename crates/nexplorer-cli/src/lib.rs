use clap::{Parser, Subcommand};
use nexplorer_config::settings::{AppConfigLayer, RemoteConfigLayer};

#[derive(Parser, Debug)]
#[command(
    name = "nexplorer",
    version,
    about = "Browse a local or SSH filesystem with natural-language requests"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[arg(long)]
    pub config: Option<String>,

    /// Skip SSH and browse this machine.
    #[arg(long)]
    pub local: bool,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub user: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Config {
        #[arg(long)]
        init: bool,
    },
    /// Print one directory listing and exit.
    Ls { path: Option<String> },
    /// Run one search and print the raw matches.
    Search {
        query: String,
        #[arg(long)]
        base: Option<String>,
    },
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        self.command.is_none()
    }

    /// Command-line connection flags as the topmost config layer.
    pub fn overrides(&self) -> Option<AppConfigLayer> {
        if self.host.is_none() && self.port.is_none() && self.user.is_none() {
            return None;
        }
        Some(AppConfigLayer {
            remote: Some(RemoteConfigLayer {
                host: self.host.clone(),
                port: self.port,
                username: self.user.clone(),
                ..RemoteConfigLayer::default()
            }),
            ..AppConfigLayer::default()
        })
    }
}
