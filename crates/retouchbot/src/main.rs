use anyhow::Result;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tokio::signal;
use tokio::time::sleep;

use retouch::api::{start_api_server, ApiState};
use retouch::cli::{Cli, Commands};
use retouch::telegram::{
    create_bot, schema, setup_bot_commands, HandlerDeps, ModePreferences, TelegramNotifier, TelegramSource,
};
use retouchcore::core::{config, init_logger, log_startup_configuration, metrics};
use retouchcore::enhance::{
    Intake, LocalSource, Notifier, PoolConfig, ProcessingResult, Requester, RoutingNotifier, SourceRef, SourceResolver,
    TicketBoard, WorkQueue, WorkerPool,
};
use retouchcore::{Backend, Mode};

/// How many times a panicked dispatcher is restarted before giving up
const MAX_DISPATCHER_RETRIES: u32 = 5;

/// Main entry point
///
/// Parses CLI arguments and dispatches to the matching subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, configuration, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Log panics instead of losing them on stderr
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
        if let Some(msg) = panic_info.payload().downcast_ref::<&str>() {
            log::error!("Panic message: {}", msg);
        }
    }));

    // Load environment variables from .env if present, before any config is read
    let _ = dotenv();

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;
    metrics::init_metrics();
    log_startup_configuration();

    match cli.command {
        Some(Commands::Run { webhook }) => {
            log::info!("Running bot (webhook: {})", webhook);
            run_bot(webhook).await
        }
        Some(Commands::Serve { port }) => run_api(port.unwrap_or(*config::api::PORT)).await,
        Some(Commands::Process { mode, input, output }) => run_cli_process(&mode, input, output).await,
        None => {
            log::info!("No command specified, running bot in default mode");
            run_bot(false).await
        }
    }
}

/// Queue, worker pool and ticket board shared by every surface
struct Services {
    intake: Intake,
    tickets: Arc<TicketBoard>,
    pool: WorkerPool,
}

impl Services {
    async fn start(source: Arc<dyn SourceResolver>, chats: Option<Arc<dyn Notifier>>) -> Result<Self> {
        let backend = Backend::from_config()?;
        let table = Arc::new(backend.dispatch_table()?);

        let queue = Arc::new(WorkQueue::new(*config::queue::CAPACITY));
        let tickets = Arc::new(TicketBoard::new());
        let notifier = Arc::new(RoutingNotifier::new(chats, Arc::clone(&tickets)));
        let pool = WorkerPool::spawn(Arc::clone(&queue), table, source, notifier, PoolConfig::from_env()).await?;

        Ok(Self {
            intake: Intake::new(queue),
            tickets,
            pool,
        })
    }

    fn api_state(&self) -> ApiState {
        ApiState {
            intake: self.intake.clone(),
            tickets: Arc::clone(&self.tickets),
            monitor: self.pool.monitor(),
        }
    }
}

fn default_mode() -> Mode {
    Mode::parse(&config::processing::DEFAULT_MODE).unwrap_or_else(|| {
        log::warn!(
            "DEFAULT_MODE '{}' is not a known mode, using upscale",
            config::processing::DEFAULT_MODE.as_str()
        );
        Mode::Upscale
    })
}

/// Runs the Telegram bot plus the HTTP API
async fn run_bot(use_webhook: bool) -> Result<()> {
    if config::BOT_TOKEN.is_empty() {
        return Err(anyhow::anyhow!("BOT_TOKEN environment variable not set"));
    }

    let bot = create_bot()?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let services = Services::start(
        Arc::new(TelegramSource::new(bot.clone())),
        Some(Arc::new(TelegramNotifier::new(bot.clone()))),
    )
    .await?;

    let api_state = services.api_state();
    tokio::spawn(async move {
        if let Err(e) = start_api_server(api_state, *config::api::PORT).await {
            log::error!("API server stopped: {}", e);
        }
    });

    let deps = HandlerDeps::new(
        services.intake.clone(),
        services.pool.monitor(),
        Arc::new(ModePreferences::new(default_mode())),
    );
    let handler = schema(deps);

    let webhook_url = if use_webhook { config::WEBHOOK_URL.clone() } else { None };

    if let Some(url) = webhook_url {
        use teloxide::update_listeners::webhooks;

        let addr = SocketAddr::from(([0, 0, 0, 0], *config::WEBHOOK_PORT));
        log::info!("Starting bot in webhook mode at {} (listening on {})", url, addr);
        let listener = webhooks::axum(bot.clone(), webhooks::Options::new(addr, url::Url::parse(&url)?)).await?;

        Dispatcher::builder(bot, handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("An error from the webhook listener"),
            )
            .await;
    } else {
        if use_webhook {
            log::warn!("--webhook given but WEBHOOK_URL is not set, falling back to long polling");
        }
        log::info!("Starting bot in long polling mode");
        log::info!("📡 Ready to receive updates!");
        run_polling_dispatcher(bot, handler).await;
    }

    log::info!("Shutting down worker pool...");
    services.pool.shutdown().await;
    Ok(())
}

/// Runs the polling dispatcher, restarting it with backoff when it panics
async fn run_polling_dispatcher(bot: Bot, handler: teloxide::dispatching::UpdateHandler<retouch::telegram::HandlerError>) {
    let mut retry_count = 0;

    loop {
        let bot_clone = bot.clone();
        let handler_clone = handler.clone();

        // Run the dispatcher in a separate task to isolate panics
        let handle = tokio::spawn(async move {
            use teloxide::update_listeners::Polling;

            // Create polling listener that drops pending updates on start
            let listener = Polling::builder(bot_clone.clone()).drop_pending_updates().build();

            Dispatcher::builder(bot_clone, handler_clone)
                .enable_ctrlc_handler()
                .build()
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await
        });

        match handle.await {
            Ok(()) => {
                log::info!("Dispatcher shutdown gracefully");
                break;
            }
            Err(join_err) if join_err.is_panic() => {
                log::error!("Dispatcher panicked: {}", join_err);
                if retry_count >= MAX_DISPATCHER_RETRIES {
                    log::error!("Max retries reached after panic. Exiting...");
                    break;
                }
                retry_count += 1;
                log::info!(
                    "Retrying dispatcher after panic (attempt {}/{})...",
                    retry_count,
                    MAX_DISPATCHER_RETRIES
                );
                sleep(Duration::from_secs(2u64.pow(retry_count))).await;
            }
            Err(join_err) => {
                log::warn!("Dispatcher task was cancelled: {}", join_err);
                break;
            }
        }
    }
}

/// Runs only the HTTP API until Ctrl-C
async fn run_api(port: u16) -> Result<()> {
    let services = Services::start(Arc::new(LocalSource), None).await?;

    tokio::select! {
        result = start_api_server(services.api_state(), port) => result?,
        _ = signal::ctrl_c() => log::info!("Shutting down gracefully..."),
    }

    services.pool.shutdown().await;
    Ok(())
}

/// Processes one file through the worker pool and writes the result
async fn run_cli_process(mode: &str, input: PathBuf, output: PathBuf) -> Result<()> {
    let services = Services::start(Arc::new(LocalSource), None).await?;

    let (ticket, result) = services.tickets.issue();
    let accepted = match services
        .intake
        .submit(SourceRef::Path(input.clone()), mode, Requester::Ticket(ticket))
        .await
    {
        Ok(accepted) => accepted,
        Err(e) => {
            services.tickets.cancel(ticket);
            return Err(anyhow::anyhow!("Cannot process {}: {}", input.display(), e));
        }
    };
    log::info!("Processing {} in mode {}", input.display(), accepted.mode);

    let outcome = match result.await? {
        ProcessingResult::Success(image) => {
            tokio::fs::write(&output, &image.bytes).await?;
            log::info!("Saved result to {} ({} bytes)", output.display(), image.bytes.len());
            Ok(())
        }
        ProcessingResult::Failure(failure) => Err(anyhow::anyhow!("Processing failed: {}", failure)),
    };

    services.pool.shutdown().await;
    outcome
}
