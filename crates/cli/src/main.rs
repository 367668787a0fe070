use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "hookchat")]
#[command(about = "Hookchat CLI — chat with a workflow-automation webhook", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Send one message to the webhook and print the reply.
    Send {
        /// Message text to deliver.
        message: String,

        /// Config file path (default: HOOKCHAT_CONFIG_PATH or ~/.hookchat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Webhook URL override for this send.
        #[arg(long, value_name = "URL")]
        url: Option<String>,

        /// Route through the CORS relays (true/false; default from config).
        #[arg(long, value_name = "BOOL")]
        proxy: Option<bool>,
    },

    /// Chat with the webhook interactively ("exit" or an empty line to quit).
    Chat {
        /// Config file path (default: HOOKCHAT_CONFIG_PATH or ~/.hookchat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Webhook URL override for this session.
        #[arg(long, value_name = "URL")]
        url: Option<String>,

        /// Route through the CORS relays (true/false; default from config).
        #[arg(long, value_name = "BOOL")]
        proxy: Option<bool>,
    },

    /// Show or change the persisted webhook settings.
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the resolved settings.
    Show {
        /// Config file path (default: HOOKCHAT_CONFIG_PATH or ~/.hookchat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Persist the webhook URL and/or proxy flag.
    Set {
        /// Webhook URL to store.
        #[arg(long, value_name = "URL")]
        url: Option<String>,

        /// Whether sends go through the CORS relays (true/false).
        #[arg(long, value_name = "BOOL")]
        proxy: Option<bool>,

        /// Config file path (default: HOOKCHAT_CONFIG_PATH or ~/.hookchat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("hookchat {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Send {
            message,
            config,
            url,
            proxy,
        }) => {
            if let Err(e) = run_send(config, url, proxy, message).await {
                log::error!("send failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat { config, url, proxy }) => {
            if let Err(e) = run_chat(config, url, proxy).await {
                log::error!("chat failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Config { action }) => {
            let result = match action {
                ConfigCommands::Show { config } => run_config_show(config),
                ConfigCommands::Set { url, proxy, config } => run_config_set(config, url, proxy),
            };
            if let Err(e) = result {
                log::error!("config failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn build_client(config_path: &Path) -> lib::webhook::WebhookClient {
    let store = lib::identity::SessionStore::new(lib::config::session_path(config_path));
    lib::webhook::WebhookClient::new(store)
}

async fn run_send(
    config_path: Option<PathBuf>,
    url: Option<String>,
    proxy: Option<bool>,
    message: String,
) -> anyhow::Result<()> {
    let (config, path) = lib::config::load_config(config_path)?;
    let url = url
        .or_else(|| lib::config::resolve_webhook_url(&config))
        .unwrap_or_default();
    let use_proxy = proxy.unwrap_or(config.webhook.use_proxy);

    let client = build_client(&path);
    let reply = client.send_message(&url, &message, use_proxy).await?;
    println!("{}", reply);
    Ok(())
}

async fn run_chat(
    config_path: Option<PathBuf>,
    url: Option<String>,
    proxy: Option<bool>,
) -> anyhow::Result<()> {
    use std::io::{self, BufRead, Write};

    let (config, path) = lib::config::load_config(config_path)?;
    let url = url
        .or_else(|| lib::config::resolve_webhook_url(&config))
        .unwrap_or_default();
    if url.trim().is_empty() {
        anyhow::bail!("webhook URL is not configured; run `hookchat config set --url <URL>`");
    }
    let use_proxy = proxy.unwrap_or(config.webhook.use_proxy);

    let client = build_client(&path);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let text = line.trim();
        if text.is_empty() || text == "exit" || text == "quit" {
            break;
        }
        // A failed send ends that attempt only; the loop stays usable.
        match client.send_message(&url, text, use_proxy).await {
            Ok(reply) => println!("{}", reply),
            Err(e) => println!("Error: {}", e),
        }
    }
    Ok(())
}

fn run_config_show(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (config, path) = lib::config::load_config(config_path)?;
    let url = lib::config::resolve_webhook_url(&config);
    println!("config: {}", path.display());
    println!("url: {}", url.as_deref().unwrap_or("(not set)"));
    println!("proxy: {}", config.webhook.use_proxy);
    Ok(())
}

fn run_config_set(
    config_path: Option<PathBuf>,
    url: Option<String>,
    proxy: Option<bool>,
) -> anyhow::Result<()> {
    if url.is_none() && proxy.is_none() {
        anyhow::bail!("nothing to set; pass --url and/or --proxy");
    }
    let (mut config, path) = lib::config::load_config(config_path)?;
    if let Some(u) = url {
        config.webhook.url = Some(u);
    }
    if let Some(p) = proxy {
        config.webhook.use_proxy = p;
    }
    lib::config::save_config(&config, &path)?;
    println!("saved {}", path.display());
    Ok(())
}
