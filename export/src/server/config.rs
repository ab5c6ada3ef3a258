//! Command line arguments for the export server.

use clap::Parser;

/// CLI arguments for the server.
#[derive(Parser, Debug)]
#[command(name = "export-server")]
#[command(about = "Mass log export service")]
pub struct CliArgs {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "EXPORT_CONFIG_FILE")]
    pub config: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "EXPORT_PORT")]
    pub port: u16,
}

/// Settings of the HTTP listener.
#[derive(Debug, Clone)]
pub struct ExportServerConfig {
    pub port: u16,
}

impl Default for ExportServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl From<&CliArgs> for ExportServerConfig {
    fn from(args: &CliArgs) -> Self {
        Self { port: args.port }
    }
}
