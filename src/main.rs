use std::env;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::bail;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use icelandic_lookup::{AppState, Dispatcher, MenuEntries, Registry, register_menu, router};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();

    let config = load_config()?;
    let registry = Arc::new(Registry::builtin());
    let dispatcher = Dispatcher::new(Arc::clone(&registry));

    let mut menu = MenuEntries::default();
    register_menu(&registry, &mut menu);

    match config.command {
        Command::List => {
            for entry in menu.entries() {
                println!("{}\t{}\t{}", entry.id, entry.filter, entry.title);
            }
            return Ok(ExitCode::SUCCESS);
        }
        Command::Lookup { target, text } => {
            return match dispatcher.lookup_url(&target, &text) {
                Ok(url) => {
                    println!("{url}");
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => {
                    eprintln!("{err}");
                    Ok(ExitCode::FAILURE)
                }
            };
        }
        Command::Serve => {}
    }

    info!("binding to {}:{}", config.host, config.port);
    info!("registered {} lookup targets", menu.entries().len());
    if config.disable_cache {
        info!("cache headers disabled");
    }

    let state = AppState {
        dispatcher,
        menu: Arc::new(menu),
        disable_cache: config.disable_cache,
    };

    let app = router(state).layer(TraceLayer::new_for_http());
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;
    Ok(ExitCode::SUCCESS)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Serve,
    List,
    Lookup { target: String, text: String },
}

#[derive(Debug, Clone)]
struct Config {
    host: String,
    port: u16,
    disable_cache: bool,
    command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliArgs {
    disable_cache: bool,
    command: Command,
}

fn load_config() -> anyhow::Result<Config> {
    let CliArgs {
        disable_cache,
        command,
    } = parse_args(env::args().skip(1))?;

    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);

    Ok(Config {
        host,
        port,
        disable_cache,
        command,
    })
}

fn parse_args(args: impl Iterator<Item = String>) -> anyhow::Result<CliArgs> {
    let mut disable_cache = false;
    let mut command = Command::Serve;
    let mut args = args;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--no-cache" => disable_cache = true,
            "--list" => command = Command::List,
            "--lookup" => {
                let Some(target) = args.next().filter(|t| !t.starts_with("--")) else {
                    bail!("--lookup requires a target id");
                };
                // An absent selection is the empty selection.
                let text = args.next().unwrap_or_default();
                command = Command::Lookup { target, text };
            }
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(CliArgs {
        disable_cache,
        command,
    })
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let max_level = env_filter
        .max_level_hint()
        .and_then(|hint| hint.into_level())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_max_level(max_level)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<CliArgs> {
        parse_args(args.iter().map(|a| a.to_string()))
    }

    #[test]
    fn no_arguments_serve() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.command, Command::Serve);
        assert!(!args.disable_cache);
    }

    #[test]
    fn parses_flags() {
        let args = parse(&["--no-cache", "--list"]).unwrap();
        assert!(args.disable_cache);
        assert_eq!(args.command, Command::List);
    }

    #[test]
    fn parses_lookup_with_and_without_text() {
        let args = parse(&["--lookup", "binHeadword", "hestur"]).unwrap();
        assert_eq!(
            args.command,
            Command::Lookup {
                target: "binHeadword".to_string(),
                text: "hestur".to_string(),
            }
        );
        let args = parse(&["--lookup", "binHeadword"]).unwrap();
        assert_eq!(
            args.command,
            Command::Lookup {
                target: "binHeadword".to_string(),
                text: String::new(),
            }
        );
    }

    #[test]
    fn lookup_without_target_is_an_error() {
        let err = parse(&["--lookup"]).unwrap_err();
        assert!(err.to_string().contains("requires a target id"));
        assert!(parse(&["--lookup", "--no-cache"]).is_err());
    }

    #[test]
    fn rejects_unknown_arguments() {
        let err = parse(&["--verbose"]).unwrap_err();
        assert!(err.to_string().contains("unknown argument: --verbose"));
    }
}
