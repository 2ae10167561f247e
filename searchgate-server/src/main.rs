use clap::Parser;
use searchgate_http::serve;

#[derive(Parser)]
#[command(name = "searchgate", about = "Caching gateway for full-text search backends")]
struct Cli {
    #[arg(long, env = "SEARCHGATE_BIND_ADDR", default_value = "127.0.0.1:8080")]
    bind_addr: String,
    /// Base URL the delayed cache resets are posted back to.
    #[arg(long, env = "SEARCHGATE_CALLBACK_URL")]
    callback_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    std::env::set_var("SEARCHGATE_BIND_ADDR", &cli.bind_addr);
    if let Some(url) = cli.callback_url {
        std::env::set_var("SEARCHGATE_CALLBACK_URL", url);
    }
    serve().await
}
