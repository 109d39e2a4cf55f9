//! `echoaid` - CLI for the echoaid coordination core
//!
//! Each invocation restores the persisted state (offline queue, session,
//! chat transcript), seeds the demonstration data, and runs one command.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::{anyhow, bail};
use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use tracing::{debug, info};

use echoaid::ai::{GroundedInfo, GroundedQuery};
use echoaid::chat::ChatSession;
use echoaid::cli::{
    AuthCommand, ChatCommand, Cli, Command, ConfigCommand, FeedCommand, OutputFormat,
    QueueCommand, RequestsCommand, SubmitCommand,
};
use echoaid::feed;
use echoaid::geo::{FixedGeolocator, UnavailableGeolocator};
use echoaid::request::{Coordinates, Location};
use echoaid::submission::{self, SubmissionOutcome};
use echoaid::{
    init_logging, seed, triage, verification, AiCollaborator, AppSettings, AppState, AuthService,
    Config, Connectivity, Error, GeminiClient, KeyValueStore, RequestDraft, SosRequest,
    SqliteStore, UserRole,
};

/// Everything a command may need, restored from disk.
#[derive(Debug)]
struct Context {
    store: Arc<dyn KeyValueStore>,
    ai: Arc<dyn AiCollaborator>,
    state: AppState,
    auth: AuthService,
}

impl Context {
    async fn open(config: &Config, offline: bool) -> anyhow::Result<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(config.database_path())?);
        let gemini = GeminiClient::from_config(&config.ai)?;
        debug!("Using Gemini model {}", gemini.model());
        let ai: Arc<dyn AiCollaborator> = Arc::new(gemini);
        let connectivity = Connectivity::new(!config.network.start_offline && !offline);

        let mut state = AppState::new(
            store.clone(),
            ai.clone(),
            &connectivity,
            AppSettings::from(&config.lifecycle),
            seed::requests(Utc::now()),
        )?;
        let auth = AuthService::new(store.clone(), seed::users(), config.auth.latency())?;

        // Startup replay, the same as a reconnect.
        if state.is_online() {
            let report = state.process_queue().await?;
            if !report.is_empty() {
                info!(
                    "Sent {} queued request(s), {} still queued",
                    report.sent.len(),
                    report.still_queued.len()
                );
            }
        }

        Ok(Self {
            store,
            ai,
            state,
            auth,
        })
    }

    fn require(&self, allowed: &[UserRole], action: &str) -> anyhow::Result<echoaid::User> {
        self.auth
            .require_role(allowed, action)
            .cloned()
            .map_err(user_facing)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
        command => {
            let mut ctx = Context::open(&config, cli.offline).await?;
            run(&config, &mut ctx, command).await
        }
    }
}

async fn run(config: &Config, ctx: &mut Context, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Submit(cmd) => handle_submit(ctx, cmd).await,
        Command::Queue(cmd) => handle_queue(ctx, cmd).await,
        Command::Requests(cmd) => handle_requests(ctx, cmd),
        Command::Accept { id } => {
            let volunteer = ctx.require(&[UserRole::Volunteer], "accept missions")?;
            let request = ctx
                .state
                .assign_volunteer(&id, &volunteer.id)
                .map_err(user_facing)?;
            println!("Mission accepted.");
            print_request(&request);
            Ok(())
        }
        Command::Status { id, status } => {
            ctx.require(&UserRole::ALL, "update request status")?;
            let request = ctx
                .state
                .update_request_status(&id, status.into())
                .map_err(user_facing)?;
            println!("Status updated.");
            print_request(&request);
            Ok(())
        }
        Command::Pulse { id } => {
            ctx.require(&[UserRole::Requester, UserRole::Safe], "send a pulse")?;
            let at = ctx.state.send_pulse(&id).await.map_err(user_facing)?;
            println!("Pulse sent at {}.", at.format("%H:%M:%S UTC"));
            Ok(())
        }
        Command::Investigate { id } => {
            ctx.require(&[UserRole::Volunteer], "investigate requests")?;
            let info = ctx.state.investigate(&id).await.map_err(user_facing)?;
            print_grounded(&info);
            Ok(())
        }
        Command::Evidence { id } => {
            ctx.require(&[UserRole::Volunteer], "view evidence")?;
            let checklist = ctx.state.evidence(&id).map_err(user_facing)?;
            println!("Aegis Verification Evidence for {id}");
            for item in checklist {
                let mark = if item.verified { "x" } else { " " };
                println!("  [{mark}] {}", item.text);
            }
            Ok(())
        }
        Command::Nearby { query, lat, lng } => {
            let info = ctx
                .ai
                .grounded_lookup(&GroundedQuery::maps(query, Coordinates { lat, lng }))
                .await
                .map_err(|e| user_facing(Error::Lookup(e)))?;
            print_grounded(&info);
            Ok(())
        }
        Command::Auth(cmd) => handle_auth(ctx, cmd).await,
        Command::Chat(cmd) => handle_chat(ctx, cmd).await,
        Command::Feed(cmd) => handle_feed(cmd),
        Command::Config(cmd) => handle_config(config, cmd),
    }
}

async fn handle_submit(ctx: &mut Context, cmd: SubmitCommand) -> anyhow::Result<()> {
    let user = ctx.require(&[UserRole::Requester, UserRole::Safe], "raise an SOS")?;

    let location = match (cmd.address, cmd.lat, cmd.lng) {
        (Some(address), _, _) => Location::from_address(address),
        (None, Some(lat), Some(lng)) => {
            submission::detect_location(&FixedGeolocator(Coordinates { lat, lng }))
                .await
                .map_err(user_facing)?
        }
        _ => submission::detect_location(&UnavailableGeolocator::default())
            .await
            .map_err(user_facing)?,
    };

    let draft = RequestDraft::new(
        user.id.clone(),
        cmd.emergency_type.into(),
        cmd.description,
        location,
    )
    .with_name(cmd.name.unwrap_or(user.name));

    let outcome = submission::submit(&mut ctx.state, draft).await;
    let (request, safety_info) = match &outcome {
        SubmissionOutcome::Dispatched {
            request,
            safety_info,
        } => (request, safety_info.as_ref()),
        SubmissionOutcome::Queued { request } => (request, None),
        SubmissionOutcome::Failed { .. } => bail!(outcome.message()),
    };

    if cmd.format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "message": outcome.message(),
            "request": request,
            "safetyTip": outcome.safety_tip(),
            "safetyInfo": safety_info,
        }));
    }

    println!("{}", outcome.message());
    print_request(request);
    if let Some(tip) = outcome.safety_tip() {
        println!();
        println!("Safety tip: {tip}");
    }
    if let Some(info) = safety_info {
        println!();
        print_grounded(info);
    }
    Ok(())
}

async fn handle_queue(ctx: &mut Context, cmd: QueueCommand) -> anyhow::Result<()> {
    match cmd {
        QueueCommand::Show { format } => {
            let queued = ctx.state.queue().load()?;
            if format == OutputFormat::Json {
                return print_json(&queued);
            }
            if queued.is_empty() {
                println!("Offline queue is empty.");
            }
            for request in &queued {
                print_request(request);
            }
        }
        QueueCommand::Replay => {
            let report = ctx.state.process_queue().await?;
            if !ctx.state.is_online() {
                println!(
                    "Offline: {} request(s) remain queued.",
                    report.still_queued.len()
                );
            } else if report.is_empty() {
                println!("Offline queue is empty.");
            } else {
                println!(
                    "Sent {} request(s), {} still queued.",
                    report.sent.len(),
                    report.still_queued.len()
                );
                for id in &report.sent {
                    println!("  sent: {id}");
                }
            }
        }
        QueueCommand::Clear => {
            ctx.state.queue().clear()?;
            println!("Offline queue cleared.");
        }
    }
    Ok(())
}

fn handle_requests(ctx: &Context, cmd: RequestsCommand) -> anyhow::Result<()> {
    let requests = ctx.state.requests();
    match cmd {
        RequestsCommand::List { format } => {
            print_requests(&requests.iter().collect::<Vec<_>>(), format)
        }
        RequestsCommand::Triage { format } => {
            print_requests(&triage::triage_feed(requests), format)
        }
        RequestsCommand::Stats { format } => {
            let stats = triage::dashboard_stats(requests, Utc::now());
            if format == OutputFormat::Json {
                return print_json(&stats);
            }
            println!("Active requests:    {}", stats.active_requests);
            println!("Volunteers active:  {}", stats.volunteers_active);
            println!("Highest urgency:    {}/10", stats.highest_urgency);
            println!("Resolved today:     {}", stats.resolved_today);
            Ok(())
        }
        RequestsCommand::Missions { format } => {
            let volunteer = ctx.require(&[UserRole::Volunteer], "view missions")?;
            print_requests(&triage::my_missions(requests, &volunteer.id), format)
        }
        RequestsCommand::Mine { format } => {
            let requester = ctx.require(&[UserRole::Requester, UserRole::Safe], "view your requests")?;
            print_requests(
                &triage::requests_for_requester(requests, &requester.id),
                format,
            )?;
            if format == OutputFormat::Plain {
                if let Some(banner) =
                    triage::approaching_responder(requests, ctx.auth.users(), &requester.id)
                {
                    println!();
                    println!(
                        "Aegis-verified responder {} is on the way to {}.",
                        banner.responder.name, banner.request.id
                    );
                    if let Some(code) = banner.verification_code {
                        println!("They will show the code {code} on arrival.");
                    }
                }
            }
            Ok(())
        }
    }
}

async fn handle_auth(ctx: &mut Context, cmd: AuthCommand) -> anyhow::Result<()> {
    match cmd {
        AuthCommand::Login { email, password } => {
            let user = ctx
                .auth
                .login(&email, &password)
                .await
                .map_err(user_facing)?;
            println!("Signed in as {} ({}).", user.name, user.role);
        }
        AuthCommand::Signup {
            name,
            email,
            role,
            password,
        } => {
            let user = ctx
                .auth
                .signup(&name, &email, &password, role.into())
                .await
                .map_err(user_facing)?;
            println!("Welcome, {}. Signed up as {}.", user.name, user.role);
        }
        AuthCommand::Logout => {
            ctx.auth.logout()?;
            println!("Signed out.");
        }
        AuthCommand::Whoami => match ctx.auth.current_user() {
            Some(user) => {
                println!("{} <{}>", user.name, user.email);
                println!("Role:     {}", user.role);
                if user.is_aegis_verified {
                    println!("Aegis:    verified");
                }
                if let Some(affiliation) = &user.affiliation {
                    println!("With:     {affiliation}");
                }
            }
            None => println!("Not signed in."),
        },
    }
    Ok(())
}

async fn handle_chat(ctx: &Context, cmd: ChatCommand) -> anyhow::Result<()> {
    let mut chat = ChatSession::load(ctx.store.clone(), ctx.ai.clone())?;

    if cmd.clear {
        chat.clear()?;
        println!("Conversation cleared.");
        return Ok(());
    }

    chat.open().await?;
    match cmd.message {
        Some(message) => {
            if let Some(reply) = chat.send(&message).await? {
                println!("Echo: {}", reply.text);
            }
        }
        None => {
            for message in chat.messages() {
                let speaker = match message.sender {
                    echoaid::ai::Sender::User => "You",
                    echoaid::ai::Sender::Bot => "Echo",
                };
                println!("{speaker}: {}", message.text);
            }
        }
    }
    Ok(())
}

fn handle_feed(cmd: FeedCommand) -> anyhow::Result<()> {
    let now = Utc::now();
    match cmd {
        FeedCommand::Rumors { format } => {
            let rumors = seed::rumors(now);
            let rumors = feed::rumors_newest_first(&rumors);
            if format == OutputFormat::Json {
                return print_json(&rumors);
            }
            for rumor in rumors {
                println!("[{}] {}", rumor.state, rumor.title);
                println!("    {}", rumor.details.description);
                if let Some(source) = &rumor.details.source_of_truth {
                    println!("    Source: {source}");
                }
            }
        }
        FeedCommand::Alerts { format } => {
            let alerts = seed::alerts(now);
            let alerts = feed::alerts_newest_first(&alerts);
            if format == OutputFormat::Json {
                return print_json(&alerts);
            }
            for alert in alerts {
                println!("{} {}: {}", alert.source, alert.severity, alert.title);
                println!("    {}", alert.description);
                println!("    Area: {}", alert.affected_area);
            }
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&config.redacted())?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[AI]");
                println!("  Base URL:           {}", config.ai.base_url);
                println!("  Model:              {}", config.ai.model);
                println!(
                    "  API key:            {}",
                    if config.ai.api_key.is_some() { "set" } else { "not set" }
                );
                println!("  Timeout (secs):     {}", config.ai.timeout_secs);
                println!();
                println!("[Lifecycle]");
                println!(
                    "  Default urgency:    {}",
                    config.lifecycle.default_urgency_score
                );
                println!(
                    "  Pulse cooldown:     {}s",
                    config.lifecycle.pulse_cooldown_secs
                );
                println!(
                    "  Pulse latency:      {}ms",
                    config.lifecycle.pulse_latency_ms
                );
                println!();
                println!("[Auth]");
                println!("  Latency:            {}ms", config.auth.latency_ms);
                println!();
                println!("[Network]");
                println!("  Start offline:      {}", config.network.start_offline);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn user_facing(err: Error) -> anyhow::Error {
    debug!("{err:?}");
    anyhow!(err.user_message())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_requests(requests: &[&SosRequest], format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        return print_json(requests);
    }
    if requests.is_empty() {
        println!("No requests.");
    }
    for request in requests {
        print_request(request);
    }
    Ok(())
}

fn print_request(request: &SosRequest) {
    println!(
        "{}  [{}] {}  urgency {}/10 ({})",
        request.id,
        request.status,
        request.emergency_type,
        request.urgency_score,
        request.urgency_level().label()
    );
    println!("    {}", request.description);
    println!(
        "    at {} ({})",
        request.location.address,
        request.timestamp.format("%Y-%m-%d %H:%M UTC")
    );
    if let Some(badge) = verification::badge(&request.verification) {
        println!("    {badge}");
    }
    if let Some(volunteer) = &request.volunteer_id {
        println!("    volunteer: {volunteer}");
    }
}

fn print_grounded(info: &GroundedInfo) {
    println!("{}", info.text);
    if !info.sources.is_empty() {
        println!();
        println!("Sources:");
        for source in &info.sources {
            println!("  - {} <{}>", source.title, source.uri);
        }
    }
}
