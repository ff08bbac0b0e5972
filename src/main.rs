use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use serde_json::Value;

use uri_outbound::parser::CipherPolicy;
use uri_outbound::{OutboundRegistry, ProxyItem, ProxyResult, Settings, Target};

/// Convert proxy share links into Xray or sing-box outbounds
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Share links to convert; read from --file or stdin when empty
    #[arg(value_name = "URI")]
    uris: Vec<String>,

    /// File with one share link per line
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Outbound schema to render (xray or sing)
    #[arg(short, long, default_value = "xray")]
    target: Target,

    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Unknown Shadowsocks cipher handling: permissive, fallback-none or strict
    #[arg(long, value_name = "POLICY")]
    cipher_policy: Option<CipherPolicy>,

    /// Result document to load, append converted links to and save
    #[arg(short, long, value_name = "FILE")]
    result: Option<PathBuf>,

    /// Pretty-print each outbound
    #[arg(long)]
    pretty: bool,
}

fn read_links(args: &Args) -> Result<Vec<String>> {
    let lines: Vec<String> = if !args.uris.is_empty() {
        args.uris.clone()
    } else if let Some(path) = &args.file {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read links from {}", path.display()))?
            .lines()
            .map(str::to_string)
            .collect()
    } else {
        io::stdin()
            .lock()
            .lines()
            .collect::<io::Result<_>>()
            .context("Failed to read links from stdin")?
    };

    Ok(lines
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect())
}

fn render(json: &str, pretty: bool) -> Result<String> {
    if !pretty {
        return Ok(json.to_string());
    }
    let value: Value = serde_json::from_str(json)?;
    Ok(serde_json::to_string_pretty(&value)?)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(policy) = args.cipher_policy {
        settings.parser.cipher_policy = policy;
    }

    // Initialize the logger
    env_logger::init_from_env(Env::default().default_filter_or(settings.common.log_level.as_str()));

    let registry = OutboundRegistry::from_settings(&settings);
    let result = ProxyResult::new();
    if let Some(path) = &args.result {
        result.load(path);
    }

    let links = read_links(&args)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut converted = 0;

    for link in &links {
        let outbound = match registry.get_outbound(args.target, link) {
            Ok(outbound) => outbound,
            Err(e) => {
                warn!("Skipping link: {}", e);
                continue;
            }
        };
        let json = outbound.get_outbound_str();
        if json.is_empty() {
            warn!("No usable {} outbound for {}", args.target, link);
            continue;
        }

        writeln!(out, "{}", render(json, args.pretty)?)?;
        converted += 1;

        result.add_item(ProxyItem::new(
            outbound.scheme(),
            outbound.addr(),
            outbound.port(),
            &outbound.proxy().remark,
            link,
            json,
        ));
    }

    info!("Converted {} of {} links to {}", converted, links.len(), args.target);

    if let Some(path) = &args.result {
        result.save(path)?;
        info!("Saved {} items to {}", result.len(), path.display());
    }

    Ok(())
}
