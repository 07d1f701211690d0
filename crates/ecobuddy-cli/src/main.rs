use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use ecobuddy_core::chat::{self, Chatbot};
use ecobuddy_core::config::{EcoConfig, VALID_BACKENDS};
use ecobuddy_core::filter;
use ecobuddy_core::local::LocalKv;
use ecobuddy_core::model::*;
use ecobuddy_core::scope::ViewScope;
use ecobuddy_core::seed;
use ecobuddy_core::store::AppStore;
use owo_colors::OwoColorize;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "ecobuddy", about = "Eco-Buddy: track and shrink your footprint", version)]
enum Cli {
    /// Write a project config to .ecobuddy/config.toml
    Init {
        /// Backend for account data (sqlite, rest)
        #[arg(long, default_value = "sqlite")]
        backend: String,
        /// Base URL of the hosted backend (rest only)
        #[arg(long)]
        url: Option<String>,
    },
    /// Show configuration and storage locations
    Status,
    /// Show your current stats
    Stats {
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Update one or more stats; omitted fields are left unchanged
    SetStats {
        /// Tons of CO₂ per year
        #[arg(long)]
        carbon: Option<f64>,
        /// Liters per day
        #[arg(long)]
        water: Option<f64>,
        /// Waste reduction percent
        #[arg(long)]
        waste: Option<f64>,
        /// kWh saved
        #[arg(long)]
        energy: Option<f64>,
        /// Sustainability score
        #[arg(long)]
        score: Option<i64>,
        /// Completed challenge count
        #[arg(long)]
        completed: Option<u32>,
        /// Day streak
        #[arg(long)]
        streak: Option<u32>,
    },
    /// List challenges
    Challenges {
        /// Case-insensitive search over title and description
        #[arg(short, long, default_value = "")]
        search: String,
        /// Category, or "all"
        #[arg(short, long, default_value = filter::ALL)]
        category: String,
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Browse the resource library
    Resources {
        #[arg(short, long, default_value = "")]
        search: String,
        /// Resource type (article, video, infographic, guide), or "all"
        #[arg(short, long, default_value = filter::ALL)]
        kind: String,
        #[arg(short, long, default_value = filter::ALL)]
        category: String,
    },
    /// Find local sustainable services
    Services {
        #[arg(short, long, default_value = "")]
        search: String,
        #[arg(short, long, default_value = filter::ALL)]
        category: String,
    },
    /// Show eco tips
    Tips,
    /// Actions recommended for your current stats
    Recommend,
    /// Ask the eco-assistant. Without a message, starts an interactive session.
    Chat {
        message: Option<String>,
        /// Fixed seed for tip selection
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".parse().unwrap()),
        )
        .compact()
        .init();

    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;
    let config = EcoConfig::load(Some(cwd.as_path())).unwrap_or_else(|_| EcoConfig::default_config());

    run(cli, &config, &cwd).await
}

async fn run(cli: Cli, config: &EcoConfig, cwd: &Path) -> Result<()> {
    match cli {
        Cli::Init { backend, url } => cmd_init(cwd, &backend, url),
        Cli::Status => cmd_status(config),
        Cli::Stats { json } => {
            let store = open_store(config)?;
            cmd_stats(&store, json)
        }
        Cli::SetStats {
            carbon,
            water,
            waste,
            energy,
            score,
            completed,
            streak,
        } => {
            let mut store = open_store(config)?;
            let patch = UserStatsPatch {
                carbon_footprint: carbon,
                water_usage: water,
                waste_reduction: waste,
                energy_saved: energy,
                sustainability_score: score,
                completed_challenges: completed,
                streak,
            };
            cmd_set_stats(&mut store, &patch)
        }
        Cli::Challenges {
            search,
            category,
            json,
        } => {
            let store = open_store(config)?;
            cmd_challenges(&store, &search, &category, json)
        }
        Cli::Resources {
            search,
            kind,
            category,
        } => cmd_resources(&search, &kind, &category),
        Cli::Services { search, category } => cmd_services(&search, &category),
        Cli::Tips => cmd_tips(),
        Cli::Recommend => {
            let store = open_store(config)?;
            cmd_recommend(&store)
        }
        Cli::Chat { message, seed } => {
            let seed = seed.or(config.chat.seed);
            cmd_chat(config, message, seed).await
        }
    }
}

fn open_store(config: &EcoConfig) -> Result<AppStore> {
    let kv = LocalKv::open_default(config.local.path.as_deref())
        .context("failed to open local state")?;
    tracing::debug!(path = %kv.path().display(), "local state opened");
    Ok(AppStore::new(seed::catalog(), kv).with_policy(config.challenges.completion_policy()))
}

// -- Commands --

fn cmd_init(cwd: &Path, backend: &str, url: Option<String>) -> Result<()> {
    if !VALID_BACKENDS.contains(&backend) {
        anyhow::bail!(
            "unknown backend '{backend}', valid: {}",
            VALID_BACKENDS.join(", ")
        );
    }
    let mut config = EcoConfig::default_config();
    config.backend.kind = backend.to_string();
    if let Some(url) = url {
        config.remote.url = url;
    }
    let path = config.write_project(cwd)?;
    println!("{} {}", "Wrote".green(), path.display());
    Ok(())
}

fn cmd_status(config: &EcoConfig) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    println!("{}", format!("Eco-Buddy v{version}").bold());
    println!("  {}  {}", "Backend:".dimmed(), config.backend.kind);
    if config.backend.kind == "rest" {
        println!("  {}      {}", "URL:".dimmed(), config.remote.url);
    }
    match LocalKv::open_default(config.local.path.as_deref()) {
        Ok(kv) => println!("  {}    {}", "Local:".dimmed(), kv.path().display()),
        Err(e) => println!("  {}    {}", "Local:".dimmed(), e.to_string().red()),
    }
    println!(
        "  {}     {}ms reply delay",
        "Chat:".dimmed(),
        config.chat.reply_delay_ms
    );
    Ok(())
}

fn cmd_stats(store: &AppStore, json: bool) -> Result<()> {
    let stats = store.stats();
    if json {
        println!("{}", serde_json::to_string_pretty(stats)?);
        return Ok(());
    }
    print_stats(stats);
    Ok(())
}

fn print_stats(stats: &UserStats) {
    println!("{}", "Your stats".bold());
    println!(
        "  {}  {:.1} tons CO₂/yr",
        "Carbon footprint:".dimmed(),
        stats.carbon_footprint
    );
    println!("  {}       {:.0} L/day", "Water usage:".dimmed(), stats.water_usage);
    println!(
        "  {}   {:.0}%",
        "Waste reduction:".dimmed(),
        stats.waste_reduction
    );
    println!("  {}      {:.0} kWh", "Energy saved:".dimmed(), stats.energy_saved);
    println!(
        "  {}             {}",
        "Score:".dimmed(),
        stats.sustainability_score.green()
    );
    println!(
        "  {}         {} completed, {} streak",
        "Challenges:".dimmed(),
        stats.completed_challenges,
        stats.streak
    );
}

fn cmd_set_stats(store: &mut AppStore, patch: &UserStatsPatch) -> Result<()> {
    if patch.is_empty() {
        anyhow::bail!("nothing to update; pass at least one of --carbon, --water, --waste, --energy, --score, --completed, --streak");
    }
    let stats = store.update_user_stats(patch);
    print_stats(stats);
    Ok(())
}

fn cmd_challenges(store: &AppStore, search: &str, category: &str, json: bool) -> Result<()> {
    let list = filter::filter_challenges(store.challenges(), search, category);
    if json {
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }
    if list.is_empty() {
        println!("{}", "No challenges match.".dimmed());
        return Ok(());
    }
    for c in list {
        println!(
            "{} {}  {}",
            format!("[{}]", c.id).dimmed(),
            c.title.bold(),
            format!("{} · {} days · {} pts", c.category, c.duration, c.points).dimmed()
        );
        println!("    {}", c.description);
        for (i, step) in c.steps.iter().enumerate() {
            println!("    {}. {step}", i + 1);
        }
    }
    Ok(())
}

fn cmd_resources(search: &str, kind: &str, category: &str) -> Result<()> {
    let all = seed::resources();
    let list = filter::filter_resources(&all, search, kind, category);
    if list.is_empty() {
        println!("{}", "No resources match.".dimmed());
        return Ok(());
    }
    for r in list {
        println!(
            "{}  {}",
            r.title.bold(),
            format!("{} · {}", r.kind, r.category).dimmed()
        );
        println!("    {}", r.description);
        println!("    {}", r.url.cyan());
    }
    Ok(())
}

fn cmd_services(search: &str, category: &str) -> Result<()> {
    let all = seed::local_services();
    let list = filter::filter_services(&all, search, category);
    if list.is_empty() {
        println!("{}", "No services match.".dimmed());
        return Ok(());
    }
    for s in list {
        let full = s.full_stars();
        println!(
            "{}  {}{} {}",
            s.name.bold(),
            "★".repeat(full).yellow(),
            "☆".repeat(5 - full).dimmed(),
            s.rating
        );
        println!("    {} · {}", s.category.dimmed(), s.address);
        println!("    {}", s.description);
        if let Some(ref phone) = s.phone {
            println!("    {phone}");
        }
        if let Some(ref website) = s.website {
            println!("    {}", website.cyan());
        }
    }
    Ok(())
}

fn cmd_tips() -> Result<()> {
    for tip in seed::eco_tips() {
        println!("{}  {}", tip.title.bold(), tip.category.dimmed());
        println!("    {}", tip.content);
        if let Some(ref source) = tip.source {
            println!("    {}", format!("source: {source}").dimmed());
        }
    }
    Ok(())
}

fn cmd_recommend(store: &AppStore) -> Result<()> {
    let picks = filter::recommended_actions(store.stats(), store.eco_actions());
    if picks.is_empty() {
        println!("{}", "You're doing great. No recommendations right now.".green());
        return Ok(());
    }
    println!("{}", "Recommended actions".bold());
    for a in picks {
        println!(
            "  {}  {}",
            a.title.bold(),
            format!("{} · {} · saves {} t CO₂", a.category, a.difficulty, a.impact.carbon).dimmed()
        );
        println!("      {}", a.description);
    }
    Ok(())
}

async fn cmd_chat(config: &EcoConfig, message: Option<String>, seed: Option<u64>) -> Result<()> {
    let actions = seed::eco_actions();

    // One-shot replies skip the simulated typing delay.
    if let Some(message) = message {
        let bot = Chatbot::new(Duration::ZERO, seed);
        if message.trim().is_empty() {
            return Ok(());
        }
        println!("{}", bot.reply_now(&message, &actions).content);
        return Ok(());
    }

    let bot = Chatbot::new(Duration::from_millis(config.chat.reply_delay_ms), seed);
    let interrupt = ViewScope::new();
    let ctrl_c = interrupt.token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    println!("{} {}", "Eco-Assistant:".green().bold(), chat::GREETING);
    println!("{}", "(type 'exit' to quit)".dimmed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = interrupt.token().cancelled() => None,
        };
        let Some(line) = line else { break };
        let input = line.trim();
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }
        if input.is_empty() {
            continue;
        }
        eprint!("{}", "Eco-Assistant is typing...\r".dimmed());
        let turn = interrupt.child();
        match bot.reply(&turn, input, &actions).await {
            Ok(reply) => println!("{} {}", "Eco-Assistant:".green().bold(), reply.content),
            Err(ecobuddy_core::error::EcoError::Cancelled) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
