#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

use clap::{Args, Parser, Subcommand};
use fcm_dispatch::config::Config;
use fcm_dispatch::domain::Priority;
use fcm_dispatch::{ApiVersion, FcmClient, Reason, Request, SendOutcome, Target, telemetry};
use serde_json::Value;
use std::process::ExitCode;
use tracing::Instrument;

#[derive(Debug, Parser)]
#[command(name = "fcm-dispatch", version, about = "Send and manage FCM push notifications")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send a message to tokens, a topic, a condition or a device group
    Send(SendArgs),
    /// Subscribe tokens to a topic
    Subscribe(TopicArgs),
    /// Unsubscribe tokens from a topic
    Unsubscribe(TopicArgs),
    /// Manage legacy device groups
    #[command(subcommand)]
    Group(GroupCommand),
}

#[derive(Debug, Args)]
#[group(id = "target", required = true, multiple = false)]
struct TargetArgs {
    /// Registration token; repeat for a multicast send (legacy only)
    #[arg(long = "token")]
    tokens: Vec<String>,

    #[arg(long)]
    topic: Option<String>,

    /// Topic condition, e.g. "'news' in topics && 'sports' in topics"
    #[arg(long)]
    condition: Option<String>,

    /// Device group notification key (legacy only)
    #[arg(long)]
    group: Option<String>,
}

#[derive(Debug, Args)]
struct SendArgs {
    #[command(flatten)]
    target: TargetArgs,

    #[arg(long, requires = "body")]
    title: Option<String>,

    #[arg(long, requires = "title")]
    body: Option<String>,

    /// JSON object of string values
    #[arg(long)]
    data: Option<String>,

    #[arg(long)]
    android: Option<String>,

    #[arg(long)]
    apns: Option<String>,

    #[arg(long)]
    webpush: Option<String>,

    /// normal or high (legacy only)
    #[arg(long)]
    priority: Option<Priority>,

    /// Legacy only
    #[arg(long)]
    collapse_key: Option<String>,

    /// Seconds, at most four weeks (legacy only)
    #[arg(long)]
    time_to_live: Option<u32>,

    /// Ask FCM to validate the message without delivering it
    #[arg(long)]
    validate_only: bool,
}

#[derive(Debug, Args)]
struct TopicArgs {
    #[arg(long)]
    topic: String,

    #[arg(long = "token", required = true)]
    tokens: Vec<String>,
}

#[derive(Debug, Subcommand)]
enum GroupCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long = "token", required = true)]
        tokens: Vec<String>,
    },
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        notification_key: String,
        #[arg(long = "token", required = true)]
        tokens: Vec<String>,
    },
    Remove {
        #[arg(long)]
        name: String,
        #[arg(long)]
        notification_key: String,
        #[arg(long = "token", required = true)]
        tokens: Vec<String>,
    },
    /// Print the notification key registered under a group name
    Lookup {
        #[arg(long)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let telemetry_guard = telemetry::init_telemetry(&cli.config.telemetry)?;

    let span = tracing::info_span!("fcm_dispatch", api_version = %cli.config.fcm.api_version);
    let result = run(&cli).instrument(span).await;
    telemetry_guard.shutdown();

    let outcome = result?;
    print_outcome(&outcome)?;
    Ok(if outcome.is_result_ok() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn run(cli: &Cli) -> anyhow::Result<SendOutcome> {
    let params = cli.config.fcm.connection_params()?;
    let client = FcmClient::new(params, cli.config.fcm.timeout())?;

    let outcome = match &cli.command {
        Command::Send(args) => send(&client, args).await?,
        Command::Subscribe(args) => {
            let request = client.request(Reason::TopicManagement).await?;
            request.subscribe_to_topic(&args.topic, args.tokens.clone())?.send().await?
        }
        Command::Unsubscribe(args) => {
            let request = client.request(Reason::TopicManagement).await?;
            request.unsubscribe_from_topic(&args.topic, args.tokens.clone())?.send().await?
        }
        Command::Group(command) => group(&client, command).await?,
    };
    Ok(outcome)
}

async fn send(client: &FcmClient, args: &SendArgs) -> anyhow::Result<SendOutcome> {
    let (target, reason) = target_of(&args.target, client.api_version())?;
    let mut request = client.request(reason).await?.target(target)?;

    if let (Some(title), Some(body)) = (&args.title, &args.body) {
        request = request.notification(title.as_str(), body.as_str())?;
    }
    if let Some(data) = &args.data {
        request = request.data(&parse_json("data", data)?)?;
    }
    if let Some(config) = &args.android {
        request = request.android_config(&parse_json("android", config)?)?;
    }
    if let Some(config) = &args.apns {
        request = request.apns_config(&parse_json("apns", config)?)?;
    }
    if let Some(config) = &args.webpush {
        request = request.webpush_config(&parse_json("webpush", config)?)?;
    }
    if let Some(priority) = args.priority {
        request = request.priority(priority)?;
    }
    if let Some(collapse_key) = &args.collapse_key {
        request = request.collapse_key(collapse_key.as_str())?;
    }
    if let Some(ttl) = args.time_to_live {
        request = request.time_to_live(ttl)?;
    }
    if args.validate_only {
        request = request.validate_only(true)?;
    }

    Ok(request.send().await?)
}

/// Legacy topic, condition and group sends have their own reasons; v1 sends everything as a token send.
fn target_of(args: &TargetArgs, version: ApiVersion) -> anyhow::Result<(Target, Reason)> {
    let (target, legacy_reason) = if let Some(topic) = &args.topic {
        (Target::topic(topic)?, Reason::TopicSending)
    } else if let Some(condition) = &args.condition {
        (Target::condition(condition.as_str())?, Reason::TopicSending)
    } else if let Some(group) = &args.group {
        (Target::group(group.as_str()), Reason::GroupSending)
    } else if let [token] = args.tokens.as_slice() {
        (Target::token(token.as_str()), Reason::TokenSending)
    } else {
        (Target::tokens(args.tokens.iter().cloned())?, Reason::TokenSending)
    };

    let reason = match version {
        ApiVersion::Legacy => legacy_reason,
        ApiVersion::V1 => Reason::TokenSending,
    };
    Ok((target, reason))
}

async fn group(client: &FcmClient, command: &GroupCommand) -> anyhow::Result<SendOutcome> {
    let request: Request = client.request(Reason::GroupManagement).await?;
    let outcome = match command {
        GroupCommand::Create { name, tokens } => request.create_group(name.as_str(), tokens.clone())?.send().await?,
        GroupCommand::Add { name, notification_key, tokens } => {
            request.add_to_group(name.as_str(), notification_key.as_str(), tokens.clone())?.send().await?
        }
        GroupCommand::Remove { name, notification_key, tokens } => {
            request.remove_from_group(name.as_str(), notification_key.as_str(), tokens.clone())?.send().await?
        }
        GroupCommand::Lookup { name } => request.notification_key(name.as_str())?.send_get().await?,
    };
    Ok(outcome)
}

fn parse_json(what: &str, raw: &str) -> anyhow::Result<Value> {
    serde_json::from_str(raw).map_err(|e| anyhow::anyhow!("--{what} is not valid JSON: {e}"))
}

#[allow(clippy::print_stdout)]
fn print_outcome(outcome: &SendOutcome) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}
