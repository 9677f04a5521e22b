use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lobby_service::{LobbyHub, Peer};
use serde_json::json;
use shared::invite::find_in_args;
use shared::prelude::*;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "lobby",
    about = "Runs two-party matchmaking scenarios against an in-memory lobby service"
)]
struct Cli {
    /// JSON file with matchmaking settings
    #[arg(long, env = "LOBBY_CONFIG")]
    config: Option<PathBuf>,

    /// Name given to created lobbies (overrides the config file)
    #[arg(long, env = "LOBBY_GAME_NAME")]
    game_name: Option<String>,

    /// How long to wait for more events before a step counts as settled
    #[arg(long, default_value_t = 20)]
    idle_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create, join, ready up and start a match
    Handshake,
    /// Start a lobby and have one side walk away
    Abandon {
        #[arg(long, value_enum, default_value_t = Walkout::Disconnect)]
        how: Walkout,
    },
    /// Exchange chat messages, alternating host and guest
    Chat { messages: Vec<String> },
    /// Host invites the guest, who joins from the invitation's launch argument
    Invite,
    /// Create some lobbies and browse them
    Browse {
        #[arg(long, default_value_t = 3)]
        lobbies: u32,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Walkout {
    /// Guest loses its connection
    Disconnect,
    /// Guest leaves on purpose
    Leave,
    /// Host leaves, closing the lobby
    HostLeaves,
}

fn load_config(cli: &Cli) -> Result<MatchmakingConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        }
        None => MatchmakingConfig::default(),
    };
    if let Some(name) = &cli.game_name {
        config.game_name = name.clone();
    }
    Ok(config)
}

/// Pumps every peer until nothing new has arrived for `idle`.
async fn settle(peers: &mut [&mut Peer<SignalLog>], idle: Duration) -> Result<()> {
    loop {
        let mut handled = 0;
        for peer in peers.iter_mut() {
            handled += peer.pump()?;
        }
        if handled == 0 {
            tokio::time::sleep(idle).await;
            let mut late = 0;
            for peer in peers.iter_mut() {
                late += peer.pump()?;
            }
            if late == 0 {
                return Ok(());
            }
        }
    }
}

struct Duel {
    host: Peer<SignalLog>,
    guest: Peer<SignalLog>,
    lobby: LobbyId,
    idle: Duration,
}

impl Duel {
    async fn open(hub: &LobbyHub, config: &MatchmakingConfig, idle: Duration) -> Result<Self> {
        let mut host = Peer::connect(hub, "host", SignalLog::new(), config.clone());
        let mut guest = Peer::connect(hub, "guest", SignalLog::new(), config.clone());
        host.matchmaking.create()?;
        settle(&mut [&mut host], idle).await?;
        let lobby = host
            .matchmaking
            .session()
            .current_id()
            .context("host did not end up in a lobby")?;
        guest.matchmaking.join(lobby)?;
        let mut duel = Self {
            host,
            guest,
            lobby,
            idle,
        };
        duel.settle().await?;
        Ok(duel)
    }

    async fn settle(&mut self) -> Result<()> {
        settle(&mut [&mut self.host, &mut self.guest], self.idle).await
    }

    async fn ready_and_start(&mut self) -> Result<()> {
        self.host.matchmaking.set_ready()?;
        self.guest.matchmaking.set_ready()?;
        self.settle().await?;
        self.host.matchmaking.start_match()?;
        self.settle().await
    }

    fn report(&self) -> serde_json::Value {
        json!({
            "lobby": self.lobby,
            "host": self.host.matchmaking.frontend().signals,
            "guest": self.guest.matchmaking.frontend().signals,
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    tracing::info!("🎮 Running {:?} for '{}'", cli.command, config.game_name);
    let idle = Duration::from_millis(cli.idle_ms);
    let hub = LobbyHub::new();

    let report = match cli.command {
        Commands::Handshake => {
            let mut duel = Duel::open(&hub, &config, idle).await?;
            duel.ready_and_start().await?;
            duel.host.matchmaking.session_loaded()?;
            duel.guest.matchmaking.session_loaded()?;
            duel.settle().await?;
            duel.report()
        }
        Commands::Abandon { how } => {
            let mut duel = Duel::open(&hub, &config, idle).await?;
            match how {
                Walkout::Disconnect => duel.guest.matchmaking.service().disconnect(),
                Walkout::Leave => duel.guest.matchmaking.leave()?,
                Walkout::HostLeaves => {
                    duel.ready_and_start().await?;
                    duel.host.matchmaking.leave()?;
                }
            }
            duel.settle().await?;
            duel.report()
        }
        Commands::Chat { messages } => {
            let mut duel = Duel::open(&hub, &config, idle).await?;
            for (i, text) in messages.iter().enumerate() {
                let sender = if i % 2 == 0 { &mut duel.host } else { &mut duel.guest };
                sender.matchmaking.send_chat(text)?;
            }
            duel.settle().await?;
            json!({
                "lobby": duel.lobby,
                "history": duel.host.matchmaking.chat().history(duel.lobby),
            })
        }
        Commands::Invite => {
            let mut host = Peer::connect(&hub, "host", SignalLog::new(), config.clone());
            let mut guest = Peer::connect(&hub, "guest", SignalLog::new(), config.clone());
            host.matchmaking.create()?;
            settle(&mut [&mut host], idle).await?;
            let guest_id = guest.matchmaking.service().local_id();
            host.matchmaking.send_invitation(guest_id)?;

            // the invited client is relaunched with the connection string
            let launch: Vec<String> = std::iter::once("lobby".to_string())
                .chain(hub.invitations(guest_id).into_iter().map(|(_, raw)| raw))
                .collect();
            let lobby = find_in_args(&launch).context("no invitation reached the guest")?;
            guest.matchmaking.join(lobby)?;
            let mut duel = Duel {
                host,
                guest,
                lobby,
                idle,
            };
            duel.settle().await?;
            duel.report()
        }
        Commands::Browse { lobbies } => {
            let mut hosts = Vec::new();
            for i in 0..lobbies {
                let lobby_config = MatchmakingConfig {
                    game_name: format!("{} #{}", config.game_name, i + 1),
                    ..config.clone()
                };
                let name = format!("host-{}", i + 1);
                let mut host = Peer::connect(&hub, &name, SignalLog::new(), lobby_config);
                host.matchmaking.create()?;
                hosts.push(host);
            }
            let mut refs: Vec<&mut Peer<SignalLog>> = hosts.iter_mut().collect();
            settle(&mut refs, idle).await?;

            let mut browser = Peer::connect(&hub, "browser", SignalLog::new(), config.clone());
            browser.matchmaking.request_list()?;
            settle(&mut [&mut browser], idle).await?;
            json!({ "browser": browser.matchmaking.frontend().signals })
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
