use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "arena-bridge",
    about = "Arena Bridge - OpenAI-compatible API over a browser WebSocket link",
    version = env!("CARGO_PKG_VERSION"),
    author
)]
pub struct Cli {
    #[arg(long, env = "ARENA_BRIDGE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(short, long, env = "ARENA_BRIDGE_PORT", default_value = "5102")]
    pub port: u16,

    /// Directory holding config.jsonc, models.json and model_endpoint_map.json
    #[arg(short, long, env = "ARENA_BRIDGE_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["arena-bridge"]);
        assert_eq!(cli.host, "127.0.0.1");
        assert_eq!(cli.port, 5102);
        assert_eq!(cli.data_dir, PathBuf::from("."));
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from(["arena-bridge", "--host", "0.0.0.0", "-p", "8080", "-d", "/srv/bridge"]);
        assert_eq!(cli.host, "0.0.0.0");
        assert_eq!(cli.port, 8080);
        assert_eq!(cli.data_dir, PathBuf::from("/srv/bridge"));
    }
}
