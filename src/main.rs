// Application modules
mod ai;
mod browser;
mod config;
mod core;
mod logger;
mod server;
mod ui;

use ai::RuleTable;
use config::Config;
use crate::core::Responder;
use server::ChatServer;

fn main() -> anyhow::Result<()> {
    logger::init();
    log::info!("🌾 CropGPT starting");

    let config = Config::default();
    log::info!("📁 Configuration loaded");

    let backend = ai::load_backend(&config);
    let rules = RuleTable::farming();
    log::info!("📚 Demo topics: {}", rules.topics().join(", "));

    let responder = Responder::new(backend, rules, config.decoding.clone());

    println!("🌾 Starting CropGPT Chatbot...");
    println!("{}", "=".repeat(70));
    if responder.is_demo() {
        println!("⚠️  Running in DEMO mode - Using sample responses");
    } else {
        println!("✅ Model loaded successfully - Using fine-tuned model");
    }
    println!("{}", "=".repeat(70));

    let server = ChatServer::bind(&config.bind_addr(), &config.app_title)?;
    let url = config.local_url();
    println!("Running on local URL:  {}", url);
    if config.share {
        println!("Shared on every network interface, port {}", config.port);
        log::info!("🔗 Sharing enabled, bound to {}", config.bind_addr());
    }

    if config.open_browser {
        browser::open(&url);
    }

    server.serve(responder);
    log::info!("👋 CropGPT stopped");
    Ok(())
}
