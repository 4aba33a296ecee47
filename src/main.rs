//! Colony - 多智能体工作流编排
//!
//! 入口：初始化日志与配置，按配置创建 Agent 与协调器，对单个目标运行一次协调并输出结果。
//! Ctrl-C 触发协作式取消，已完成的 Agent 结果仍会输出。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use colony::agent::{Agent, AgentEvent};
use colony::config::load_config_or_default;
use colony::coordinator::{AgentCoordinator, Topology};
use colony::llm::create_llm_from_config;
use colony::memory::{InMemoryStore, MemoryStore};
use colony::observability;
use colony::tools::{EchoTool, ToolRegistry};

/// 对一个目标运行多智能体协调
#[derive(Parser, Debug)]
#[command(name = "colony")]
#[command(about = "Plan, execute and synthesize with coordinated agents")]
#[command(version)]
struct Cli {
    /// 要完成的目标
    goal: String,

    /// sequential / parallel / collaborative
    #[arg(short, long, default_value = "sequential")]
    topology: Topology,

    /// 额外的配置文件（覆盖 config/default.toml）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 覆盖协作轮数
    #[arg(long)]
    rounds: Option<usize>,

    /// 以 JSON 输出完整结果
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();
    let cli = Cli::parse();

    let mut cfg = load_config_or_default(cli.config.clone());
    if let Some(rounds) = cli.rounds {
        cfg.coordinator.collaborative_rounds = rounds;
    }

    let llm = create_llm_from_config(&cfg.llm);

    let mut registry = ToolRegistry::new();
    registry.register(EchoTool).context("Failed to register tools")?;
    let registry = Arc::new(registry);

    let memory: Option<Arc<dyn MemoryStore>> = cfg
        .memory
        .enabled
        .then(|| Arc::new(InMemoryStore::new(cfg.memory.max_entries)) as Arc<dyn MemoryStore>);

    let scheduler = cfg.scheduler();
    let agents: Vec<Agent> = cfg
        .agent_profiles()
        .into_iter()
        .map(|profile| {
            let agent = Agent::new(
                profile,
                llm.clone(),
                registry.clone(),
                scheduler.clone(),
                cfg.planner_config(),
            )
            .with_constraints(cfg.planning_constraints());
            match &memory {
                Some(m) => agent.with_memory(m.clone()),
                None => agent,
            }
        })
        .collect();

    let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel::<AgentEvent>();
    let coordinator = AgentCoordinator::new(agents, cfg.coordinator_config()).with_events(events_tx);

    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            if let Ok(line) = serde_json::to_string(&event) {
                tracing::debug!(event = %line, "progress");
            }
        }
    });

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    let result = coordinator.run(&cli.goal, cli.topology, &cancel).await;
    drop(coordinator);
    let _ = printer.await;

    if cli.json {
        let out = serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
        println!("{out}");
    } else {
        println!("{}", result.final_text);
        println!();
        println!(
            "topology: {} | success: {} | confidence: {:.2} | agents run: {}{}",
            result.topology,
            result.success,
            result.confidence,
            result.len(),
            if result.cancelled { " | cancelled" } else { "" }
        );
    }

    Ok(())
}
