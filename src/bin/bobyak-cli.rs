use std::path::PathBuf;
use std::sync::Arc;

use bobyak_sdk::{ApiClient, ApiError, FileCredentialStore, RequestOptions};
use clap::{Parser, Subcommand};
use reqwest::Method;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "bobyak-cli")]
#[command(about = "Command-line client for the bobyak backend, through the proxy", long_about = None)]
struct Cli {
    /// Proxy mount URL.
    #[arg(short, long, default_value = "http://localhost:8080/api/proxy")]
    url: String,

    /// File holding the bearer token between invocations.
    #[arg(short, long, default_value = ".bobyak-token")]
    token_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the access token
    Login { login_id: String, password: String },
    /// Forget the stored token
    Logout,
    /// List the clubs you belong to
    Whoami,
    /// GET a backend path, e.g. `/teams/me`
    Get { path: String },
    /// Send a JSON request with any method
    Send {
        #[arg(value_parser = parse_method)]
        method: Method,
        path: String,
        /// JSON body
        #[arg(long)]
        json: Option<String>,
    },
    /// Submit a mission photo for a group
    Submit {
        mission_id: i64,
        #[arg(long)]
        group: i64,
        photo: PathBuf,
    },
}

fn parse_method(raw: &str) -> Result<Method, String> {
    raw.to_ascii_uppercase()
        .parse()
        .map_err(|e| format!("invalid method `{raw}`: {e}"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let store = Arc::new(FileCredentialStore::new(cli.token_file));
    let api = ApiClient::new(&cli.url, store);

    let result = match cli.command {
        Commands::Login { login_id, password } => api
            .login(&login_id, &password)
            .await
            .map(|_| Some(Value::String("Logged in".into()))),
        Commands::Logout => api.logout().map(|_| None),
        Commands::Whoami => api
            .my_teams()
            .await
            .and_then(|teams| Ok(Some(serde_json::to_value(teams)?))),
        Commands::Get { path } => api.fetch(&path, RequestOptions::new(Method::GET)).await,
        Commands::Send { method, path, json } => {
            let mut options = RequestOptions::new(method);
            if let Some(raw) = json {
                options = options.json(serde_json::from_str(&raw)?);
            }
            api.fetch(&path, options).await
        }
        Commands::Submit {
            mission_id,
            group,
            photo,
        } => {
            let bytes = tokio::fs::read(&photo).await?;
            api.submit_mission(mission_id, group, bytes).await
        }
    };

    print_result(result)
}

fn print_result(result: Result<Option<Value>, ApiError>) -> Result<(), Box<dyn std::error::Error>> {
    match result {
        Ok(Some(json)) => println!("{}", serde_json::to_string_pretty(&json)?),
        Ok(None) => {}
        Err(e) => {
            match e.detail() {
                Some(detail) => eprintln!("Error: {detail}"),
                None => eprintln!("Error: {e}"),
            }
            std::process::exit(1);
        }
    }
    Ok(())
}
