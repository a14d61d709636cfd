//! Demo CLI entry point: wires configuration, an LLM client, and the Agent
//! facade together for manual exercising. Not part of the core contract.

use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};

use taskgraph::config::Config;
use taskgraph::llm::{AnthropicClient, CompletionResponse, LlmClient, MockLlmClient, StopReason, TokenUsage};
use taskgraph::scheduler::SchedulerConfig;
use taskgraph::tools::builtin::{AddTool, EchoTool, PlanTaskTool};
use taskgraph::tools::Tool;
use taskgraph::Agent;

mod cli;
use cli::{Cli, Command};

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = Config::load();

    match cli.command {
        Command::Chat { prompt, with_tools, mock } => {
            let model: Arc<dyn LlmClient> = if mock {
                tracing::info!("main: using MockLlmClient, no network call will be made");
                Arc::new(MockLlmClient::new(vec![CompletionResponse {
                    text: Some(format!("(mock reply to: {prompt})[DONE]")),
                    tool_calls: vec![],
                    stop_reason: StopReason::EndTurn,
                    thinking: None,
                    usage: TokenUsage::default(),
                }]))
            } else {
                Arc::new(AnthropicClient::from_config(&config.llm).context("failed to build Anthropic client")?)
            };

            let agent = Agent::new(model.clone(), SchedulerConfig::from(&config.scheduler), config.runner.max_iterations);

            let tools: Vec<Arc<dyn Tool>> = if with_tools {
                vec![Arc::new(EchoTool), Arc::new(AddTool), Arc::new(PlanTaskTool::new(model))]
            } else {
                vec![]
            };

            let result = agent.chat(prompt, tools).await.context("chat run did not complete")?;
            println!("{result}");
            Ok(())
        }
    }
}
