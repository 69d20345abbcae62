use clap::Parser;

use personalize_core::credentials::CredentialParts;
use personalize_mcp_runtime::{McpServer, RuntimeConfig};

#[derive(Parser)]
#[command(
    name = "personalize-mcp",
    version,
    about = "Sitecore Personalize MCP server over stdio"
)]
struct Cli {
    /// Tenant API client id
    #[arg(long, env = "SITECORE_CLIENT_ID")]
    client_id: Option<String>,

    /// Tenant API client secret
    #[arg(long, env = "SITECORE_CLIENT_SECRET")]
    client_secret: Option<String>,

    /// Tenant region: EU, US or AP (unrecognized values fall back to EU)
    #[arg(long, env = "SITECORE_REGION")]
    region: Option<String>,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let server = McpServer::new(RuntimeConfig {
        credentials: CredentialParts::new(cli.client_id, cli.client_secret, cli.region),
    });

    if let Err(err) = server.serve_stdio().await {
        eprintln!("personalize-mcp: {err}");
        std::process::exit(1);
    }
}
