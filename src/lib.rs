pub mod agent;
pub mod cli;
pub mod config;
pub mod history;
pub mod interview;
pub mod llm;
pub mod models;
pub mod server;

use agent::InterviewAgent;
use cli::Args;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Store Type: {}", args.store_type);
    info!("Store Host: {}", args.store_host);
    info!("Store Document: {}{}", args.store_key_prefix, args.store_document);
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("LLM Timeout: {}s", args.llm_timeout_secs);
    info!("Prompts Path: {}", args.prompts_path);
    info!("Rate Limit: {}/s", args.rate_limit_per_second);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let agent = Arc::new(InterviewAgent::new(&args).await?);
    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, agent, args);
    server.run().await?;

    Ok(())
}
