//! `apex` binary: run an objective through the orchestrator or a swarm
//! against an OpenAI-compatible endpoint.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use apex_agents::agents::{AgentConfig, AgentFactory};
use apex_agents::collaborator::{HttpModel, LanguageModel};
use apex_agents::config::RuntimeConfig;
use apex_agents::orchestrator::Orchestrator;
use apex_agents::swarm::{AgentSwarm, SwarmMember, SwarmSettings, SwarmTopology};
use apex_coordination::{AgentKind, CoordinationStrategy, Protocol};

#[derive(Parser)]
#[command(name = "apex", about = "Multi-agent task execution", version)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Plan the objective and run the steps sequentially through
    /// specialized agents.
    Orchestrate {
        objective: String,

        /// Agent kinds to register, e.g. research,analysis,writing.
        #[arg(long, value_delimiter = ',', default_values_t = [
            String::from("research"),
            String::from("analysis"),
            String::from("writing"),
        ])]
        agents: Vec<String>,
    },

    /// Fan the task out to a concurrent swarm.
    Swarm {
        task: String,

        /// Agent kinds to enlist as members.
        #[arg(long, value_delimiter = ',', default_values_t = [
            String::from("research"),
            String::from("analysis"),
            String::from("writing"),
        ])]
        agents: Vec<String>,

        #[arg(long, value_enum, default_value_t = StrategyArg::Democratic)]
        strategy: StrategyArg,

        #[arg(long, value_enum, default_value_t = ProtocolArg::Broadcast)]
        protocol: ProtocolArg,

        #[arg(long, value_enum, default_value_t = TopologyArg::Collaborative)]
        topology: TopologyArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Democratic,
    LeaderBased,
    Consensus,
    Auction,
}

impl From<StrategyArg> for CoordinationStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Democratic => Self::Democratic,
            StrategyArg::LeaderBased => Self::LeaderBased,
            StrategyArg::Consensus => Self::Consensus,
            StrategyArg::Auction => Self::Auction,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ProtocolArg {
    Broadcast,
    Direct,
    Gossip,
}

impl From<ProtocolArg> for Protocol {
    fn from(arg: ProtocolArg) -> Self {
        match arg {
            ProtocolArg::Broadcast => Self::Broadcast,
            ProtocolArg::Direct => Self::Direct,
            ProtocolArg::Gossip => Self::Gossip,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TopologyArg {
    Hierarchical,
    Collaborative,
    Competitive,
    Mesh,
}

impl From<TopologyArg> for SwarmTopology {
    fn from(arg: TopologyArg) -> Self {
        match arg {
            TopologyArg::Hierarchical => Self::Hierarchical,
            TopologyArg::Collaborative => Self::Collaborative,
            TopologyArg::Competitive => Self::Competitive,
            TopologyArg::Mesh => Self::Mesh,
        }
    }
}

fn parse_kinds(names: &[String]) -> anyhow::Result<Vec<AgentKind>> {
    names
        .iter()
        .map(|name| {
            name.parse::<AgentKind>()
                .with_context(|| format!("unknown agent kind: {name}"))
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = RuntimeConfig::load(cli.config.as_deref())?;
    let model: Arc<dyn LanguageModel> = Arc::new(HttpModel::new(
        config.endpoint.clone(),
        config.api_key.clone(),
        Duration::from_secs(config.timeout_secs),
    )?);
    let factory = AgentFactory::new(Arc::clone(&model));

    match cli.command {
        Command::Orchestrate { objective, agents } => {
            let orchestrator = Orchestrator::new(Arc::clone(&model), config.model.clone());
            for kind in parse_kinds(&agents)? {
                let agent_config =
                    AgentConfig::new(kind.to_string(), kind, config.model.clone());
                orchestrator.register_agent(factory.create(agent_config)).await;
            }

            let report = orchestrator
                .execute(&objective, &json!({}))
                .await
                .context("orchestration failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Swarm {
            task,
            agents,
            strategy,
            protocol,
            topology,
        } => {
            let settings = SwarmSettings {
                topology: topology.into(),
                strategy: strategy.into(),
                protocol: protocol.into(),
            };
            let members = parse_kinds(&agents)?
                .into_iter()
                .map(|kind| {
                    let agent_config =
                        AgentConfig::new(kind.to_string(), kind, config.model.clone());
                    SwarmMember::new(factory.create(agent_config))
                })
                .collect();
            let swarm = AgentSwarm::create(
                "apex",
                settings,
                members,
                Arc::clone(&model),
                config.model.clone(),
            );

            let result = swarm.execute(&task).await.context("swarm run failed")?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
