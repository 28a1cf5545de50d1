use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use roster_config::{get_config_path, get_log_path, running_daemon, Config, DaemonRecord};
use roster_output::*;
use roster_types::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const MAIN_HELP: &str = r#"Roster is a command line client for the roster user directory daemon.

Users are added with `roster add`, fetched by id with `roster get` or
`roster get-many`, filtered with `roster search` and paged through in id order
with `roster list`. The daemon is started automatically on first use and keeps
its users in memory until it is stopped."#;

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = MAIN_HELP)]
#[command(version)]
struct Cli {
    #[arg(long, global = true, help = "Output as JSON")]
    json: bool,

    #[arg(long, global = true, help = "Print daemon-side timing information")]
    profile: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Add a new user.")]
    Add {
        #[arg(long, help = "User id (non-zero, unique)")]
        id: i32,
        #[arg(long, help = "First name")]
        fname: String,
        #[arg(long, help = "City")]
        city: String,
        #[arg(long, help = "Phone number")]
        phone: i64,
        #[arg(long, help = "Height")]
        height: f64,
        #[arg(long, help = "Mark the user as married")]
        married: bool,
    },

    #[command(about = "Get a user by id.")]
    Get {
        #[arg(help = "User id")]
        id: i32,
    },

    #[command(about = "Get several users by id, skipping unknown ids.")]
    GetMany {
        #[arg(required = true, help = "User ids")]
        ids: Vec<i32>,
    },

    #[command(about = "Search users. Every given filter must match.")]
    Search {
        #[arg(long, help = "Match user id")]
        id: Option<i32>,
        #[arg(long, help = "Match first name")]
        fname: Option<String>,
        #[arg(long, help = "Match city")]
        city: Option<String>,
        #[arg(long, help = "Match phone number")]
        phone: Option<i64>,
        #[arg(long, help = "Match married status (true or false)")]
        married: Option<bool>,
    },

    #[command(about = "List users ordered by id.")]
    List {
        #[arg(long, default_value = "0", help = "Zero-based page number")]
        page: i32,
        #[arg(long, default_value = "0", help = "Users per page (0 lists everything)")]
        page_size: i32,
    },

    #[command(about = "Manage the roster daemon.")]
    Daemon {
        #[command(subcommand)]
        command: DaemonCommands,
    },

    #[command(about = "Print config file location and contents.")]
    Config {
        #[arg(long, help = "Write a config file with default values if none exists")]
        init: bool,
    },
}

#[derive(Subcommand)]
enum DaemonCommands {
    #[command(about = "Show current daemon state.")]
    Info,
    #[command(about = "Restart the roster daemon.")]
    Restart,
    #[command(about = "Start the roster daemon.")]
    Start,
    #[command(about = "Stop the roster daemon.")]
    Stop,
}

struct Client {
    config: Config,
    json: bool,
    profile: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    let client = Client {
        config,
        json: cli.json,
        profile: cli.profile,
    };

    match cli.command {
        Commands::Daemon { command } => handle_daemon_command(&client, command).await,
        Commands::Config { init } => handle_config(&client.config, init),
        Commands::Add {
            id,
            fname,
            city,
            phone,
            height,
            married,
        } => {
            let user = User {
                id,
                fname,
                city,
                phone,
                height,
                married,
            };
            let resp: UserResponse = client.call(METHOD_ADD_USER, &user).await?;
            client.print(&resp, format_user_response)
        }
        Commands::Get { id } => {
            let resp: UserResponse = client
                .call(METHOD_GET_USER_BY_ID, &UserIdRequest { id })
                .await?;
            client.print(&resp, format_user_response)
        }
        Commands::GetMany { ids } => {
            let resp: UsersResponse = client
                .call(METHOD_GET_USERS_BY_IDS, &UserIdsRequest { ids })
                .await?;
            client.print(&resp, format_users_response)
        }
        Commands::Search {
            id,
            fname,
            city,
            phone,
            married,
        } => {
            let req = build_search_request(id, fname, city, phone, married);
            let resp: UsersResponse = client.call(METHOD_SEARCH_USERS, &req).await?;
            client.print(&resp, format_users_response)
        }
        Commands::List { page, page_size } => {
            let resp: UsersResponse = client
                .call(METHOD_LIST_USERS, &ListUsersRequest { page, page_size })
                .await?;
            client.print(&resp, format_users_response)
        }
    }
}

fn build_search_request(
    id: Option<i32>,
    fname: Option<String>,
    city: Option<String>,
    phone: Option<i64>,
    married: Option<bool>,
) -> SearchRequest {
    SearchRequest {
        id: id.unwrap_or_default(),
        fname: fname.unwrap_or_default(),
        city: city.unwrap_or_default(),
        phone: phone.unwrap_or_default(),
        height: 0.0,
        married: married.unwrap_or_default(),
        search_married_flag: married.is_some(),
    }
}

impl Client {
    async fn call<P, R>(&self, method: &str, params: &P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let addr = ensure_daemon_running(&self.config).await?;
        let params = serde_json::to_value(params)?;
        let response = send_request(
            &addr,
            self.config.daemon.request_timeout,
            method,
            params,
            self.profile,
        )
        .await?;
        if let Some(profiling) = response.profiling {
            eprintln!("{}\n", format_profiling(&profiling));
        }
        Ok(serde_json::from_value(response.result)?)
    }

    fn print<T: Serialize>(&self, result: &T, format: fn(&T) -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(result)?);
        } else {
            println!("{}", format(result));
        }
        Ok(())
    }
}

async fn handle_daemon_command(client: &Client, command: DaemonCommands) -> Result<()> {
    let config = &client.config;
    match command {
        DaemonCommands::Start => {
            if let Some(daemon) = running_daemon() {
                println!("Daemon already running on {}", daemon.listen_addr);
            } else {
                let addr = ensure_daemon_running(config).await?;
                println!("Daemon started on {}", addr);
            }
        }
        DaemonCommands::Stop => match running_daemon() {
            Some(daemon) => {
                stop_daemon(config, &daemon).await?;
                println!("Daemon stopped");
            }
            None => println!("Daemon is not running"),
        },
        DaemonCommands::Restart => {
            if let Some(daemon) = running_daemon() {
                stop_daemon(config, &daemon).await?;
            }
            let addr = ensure_daemon_running(config).await?;
            println!("Daemon restarted on {}", addr);
        }
        DaemonCommands::Info => {
            if running_daemon().is_none() {
                println!("Daemon is not running");
                return Ok(());
            }
            let info: DescribeSessionResult = client
                .call(METHOD_DESCRIBE_SESSION, &DescribeSessionParams {})
                .await?;
            client.print(&info, format_describe_session)?;
        }
    }
    Ok(())
}

async fn stop_daemon(config: &Config, daemon: &DaemonRecord) -> Result<()> {
    send_request(
        &daemon.listen_addr,
        config.daemon.request_timeout,
        METHOD_SHUTDOWN,
        json!({}),
        false,
    )
    .await?;
    for _ in 0..50 {
        if !can_connect_to_daemon(&daemon.listen_addr).await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Ok(())
}

fn handle_config(config: &Config, init: bool) -> Result<()> {
    let config_path = get_config_path();
    if init && !config_path.exists() {
        config.save()?;
        println!("Wrote default config to {}", config_path.display());
    }

    println!("Config file: {}", config_path.display());
    println!();

    if config_path.exists() {
        println!("{}", std::fs::read_to_string(&config_path)?);
    } else {
        println!("(file does not exist, using defaults)");
    }
    Ok(())
}

/// Returns the address of a reachable daemon, spawning one if needed.
async fn ensure_daemon_running(config: &Config) -> Result<String> {
    if let Some(daemon) = running_daemon() {
        if can_connect_to_daemon(&daemon.listen_addr).await {
            return Ok(daemon.listen_addr);
        }
    }

    let addr = &config.daemon.listen_addr;
    if can_connect_to_daemon(addr).await {
        return Ok(addr.clone());
    }

    let exe = std::env::current_exe()?;
    let daemon_exe = exe
        .parent()
        .ok_or_else(|| anyhow!("Cannot locate roster-daemon next to {}", exe.display()))?
        .join("roster-daemon");

    Command::new(&daemon_exe)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .envs(std::env::vars())
        .spawn()?;

    for _ in 0..100 {
        if let Some(daemon) = running_daemon() {
            if can_connect_to_daemon(&daemon.listen_addr).await {
                return Ok(daemon.listen_addr);
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    Err(anyhow!("Failed to start daemon on {}", addr))
}

async fn can_connect_to_daemon(addr: &str) -> bool {
    TcpStream::connect(addr).await.is_ok()
}

struct DaemonResponse {
    result: Value,
    profiling: Option<ProfilingData>,
}

async fn send_request(
    addr: &str,
    timeout_secs: u64,
    method: &str,
    params: Value,
    profile: bool,
) -> Result<DaemonResponse> {
    let stream = tokio::time::timeout(Duration::from_secs(5), TcpStream::connect(addr))
        .await
        .map_err(|_| anyhow!("Timeout connecting to daemon at {}", addr))??;

    let (mut read_half, mut write_half) = stream.into_split();

    let request = RpcRequest {
        method: method.to_string(),
        params,
        profile,
    };

    write_half
        .write_all(serde_json::to_vec(&request)?.as_slice())
        .await?;
    write_half.shutdown().await?;

    let mut response_data = Vec::new();
    tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        read_half.read_to_end(&mut response_data),
    )
    .await
    .map_err(|_| anyhow!("Timeout waiting for daemon response (method: {})", method))??;

    let response: RpcResponse<Value> = serde_json::from_slice(&response_data)?;

    match response {
        RpcResponse::Success { result, profiling } => Ok(DaemonResponse { result, profiling }),
        RpcResponse::Error { error } if error.code == StatusCode::Internal => {
            let log_path = get_log_path();
            let mut msg = format_status(&error);

            if let Ok(content) = std::fs::read_to_string(&log_path) {
                let lines: Vec<&str> = content.lines().collect();
                let tail = &lines[lines.len().saturating_sub(15)..];
                msg.push_str("\n\nRecent daemon log:\n");
                msg.push_str(&tail.join("\n"));
            }
            msg.push_str(&format!("\n\nFull logs: {}", log_path.display()));
            Err(anyhow!(msg))
        }
        RpcResponse::Error { error } => Err(anyhow!(format_status(&error))),
    }
}
