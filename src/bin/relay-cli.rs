use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Admin CLI for the alert relay", long_about = None)]
struct Cli {
    /// Base URL of the admin API, including the path prefix
    #[arg(short, long, default_value = "http://localhost:8080/admin")]
    url: String,

    #[arg(long, default_value = "admin")]
    user: String,

    #[arg(short, long, env = "RELAY_ADMIN_PASSWORD")]
    password: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show load time, reload status, templates and groups
    Status,
    /// Force a config reload
    Reload,
    /// List compiled templates, or print one template's source
    Templates {
        name: Option<String>,
    },
    /// Replace the config file; rejected unless it validates and compiles
    ApplyConfig {
        file: PathBuf,
    },
    /// Create or replace a template in the template directory
    PutTemplate {
        name: String,
        file: PathBuf,
    },
    /// Remove a template from the template directory
    DeleteTemplate {
        name: String,
    },
    /// Render a payload file through a group, a named template or a template file
    Render {
        /// Alertmanager webhook JSON
        payload: PathBuf,
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        template: Option<String>,
        #[arg(long, conflicts_with_all = ["group", "template"])]
        template_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');
    let api = |path: &str| format!("{base}/api/v1{path}");

    let res = match cli.command {
        Commands::Status => client.get(api("/status")),
        Commands::Reload => client.post(api("/reload")),
        Commands::Templates { name: None } => client.get(api("/templates")),
        Commands::Templates { name: Some(name) } => client.get(api(&format!("/templates/{name}"))),
        Commands::ApplyConfig { file } => client
            .put(api("/config"))
            .body(std::fs::read_to_string(file)?),
        Commands::PutTemplate { name, file } => client
            .put(api(&format!("/templates/{name}")))
            .body(std::fs::read_to_string(file)?),
        Commands::DeleteTemplate { name } => client.delete(api(&format!("/templates/{name}"))),
        Commands::Render {
            payload,
            group,
            template,
            template_file,
        } => {
            let payload: Value = serde_json::from_str(&std::fs::read_to_string(payload)?)?;
            let template_text = match template_file {
                Some(path) => std::fs::read_to_string(path)?,
                None => String::new(),
            };
            client.post(api("/render")).json(&json!({
                "group": group.unwrap_or_default(),
                "template": template.unwrap_or_default(),
                "template_text": template_text,
                "payload": payload,
            }))
        }
    }
    .basic_auth(&cli.user, Some(&cli.password))
    .send()
    .await?;

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        eprintln!("Response: {}", text);
        std::process::exit(1);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(mut body)) => match body.remove("data") {
            Some(Value::Object(mut data)) if data.len() == 1 && data.contains_key("content") => {
                println!("{}", data.remove("content").unwrap_or_default().as_str().unwrap_or_default());
            }
            Some(data) => println!("{}", serde_json::to_string_pretty(&data)?),
            None => println!("{}", serde_json::to_string_pretty(&Value::Object(body))?),
        },
        Ok(other) => println!("{}", serde_json::to_string_pretty(&other)?),
        // Template sources come back as plain text.
        Err(_) => print!("{text}"),
    }
    Ok(())
}
