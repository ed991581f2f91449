use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the route gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, default_value = "admin-secret-key")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway status
    Status,
    /// List route definitions and compiled routes
    Routes,
    /// Show one compiled route
    Route { id: String },
    /// Store a route definition (applied on the next refresh)
    Save {
        id: String,
        #[arg(long)]
        uri: String,
        /// Predicate in `Name=arg0,arg1` form; repeatable
        #[arg(long = "predicate", required = true)]
        predicates: Vec<String>,
        /// Filter in `Name=arg0,arg1` form; repeatable
        #[arg(long = "filter")]
        filters: Vec<String>,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        order: i32,
        /// Do not prepend the configured default filters
        #[arg(long)]
        skip_default_filters: bool,
    },
    /// Delete a stored route definition
    Delete { id: String },
    /// Recompile all routes
    Refresh,
    /// List global filters with their order
    GlobalFilters,
    /// List available route filter factories
    RouteFilters,
    /// Show the sorted global + route filter chain of a route
    CombinedFilters { id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = format!("{}/admin/gateway", cli.url.trim_end_matches('/'));

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let request = match cli.command {
        Commands::Status => client.get(format!("{}/admin/status", cli.url.trim_end_matches('/'))),
        Commands::Routes => client.get(format!("{}/routes", base)),
        Commands::Route { id } => client.get(format!("{}/routes/{}", base, id)),
        Commands::Save {
            id,
            uri,
            predicates,
            filters,
            order,
            skip_default_filters,
        } => client.post(format!("{}/routes/{}", base, id)).json(&json!({
            "uri": uri,
            "predicates": predicates,
            "filters": filters,
            "order": order,
            "skip_default_filters": skip_default_filters,
        })),
        Commands::Delete { id } => client.delete(format!("{}/routes/{}", base, id)),
        Commands::Refresh => client.post(format!("{}/refresh", base)),
        Commands::GlobalFilters => client.get(format!("{}/globalfilters", base)),
        Commands::RouteFilters => client.get(format!("{}/routefilters", base)),
        Commands::CombinedFilters { id } => client.get(format!("{}/routes/{}/combinedfilters", base, id)),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    if let Some(location) = res.headers().get(reqwest::header::LOCATION) {
        println!("{} {}", status, location.to_str().unwrap_or_default());
    }

    let text = res.text().await?;
    if text.is_empty() {
        println!("{}", status);
        return Ok(());
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
