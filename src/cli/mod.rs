pub mod init;
pub mod migrate;
pub mod serve;
pub mod user;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "blog-admin")]
#[command(version)]
#[command(about = "Admin backend for a small blog", long_about = None)]
pub struct Cli {
    #[arg(short, long, default_value = "blog-admin.toml", env = "BLOG_ADMIN_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(long)]
        title: Option<String>,
    },
    Serve {
        /// Overrides `server.host` from the config file
        #[arg(short = 'H', long)]
        host: Option<String>,
        /// Overrides `server.port` from the config file
        #[arg(short, long)]
        port: Option<u16>,
    },
    Migrate,
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
}

#[derive(Subcommand)]
pub enum UserCommand {
    Add {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: Option<String>,
    },
    List,
    Remove {
        username: String,
    },
}
