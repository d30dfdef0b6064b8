use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Parser, Debug)]
#[command(author, version, about = "Per-client leaky-bucket rate limiter over HTTP", long_about = None)]
pub struct Cli {
    /// Chemin du fichier de configuration TOML (facultatif).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Adresse d'écoute (`hôte:port` ou `:port`), prioritaire sur `BIND_ADDR`
    /// et le fichier.
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// Utilise un layer JSON pour les logs (`--features json-logs`).
    #[arg(long, action = ArgAction::SetTrue)]
    pub json_logs: bool,

    /// Filtre de logs explicite (ex. "bucketd=debug").
    #[arg(long, value_name = "FILTER")]
    pub log_filter: Option<String>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bind_flag_accepts_host_names_and_bare_ports() {
        for addr in ["localhost:3000", ":3000", "127.0.0.1:3000"] {
            let cli = match Cli::try_parse_from(["bucketd", "--bind", addr, "--json-logs"]) {
                Ok(cli) => cli,
                Err(err) => panic!("arguments should parse: {err}"),
            };
            assert_eq!(cli.bind.as_deref(), Some(addr));
            assert!(cli.json_logs);
        }
    }
}
