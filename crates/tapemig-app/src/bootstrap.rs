use std::path::PathBuf;
use std::sync::Arc;

use tapemig_config::{LoggingSettings, MigrationConfig, load_config};
use tapemig_core::{NameLookup, SanityChecker, error_chain};
use tapemig_data::{MigrationStore, TableNames, run_migrations};
use tapemig_events::{EventBus, EventId};
use tapemig_linker::NameLookupTable;
use tapemig_pipeline::{
    AwsCliUploader, Collaborators, CommandSanityChecker, CommandSlicer, ParallelTapeExecutor,
    TapeImportConfirmer, UnitOfWorkFactory,
};
use tapemig_telemetry::{LogFormat, LoggingConfig, Metrics, build_sha, init_logging};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::cli::{Cli, Command, ProcessArgs, StatusArgs};
use crate::error::{AppError, AppResult};

/// Everything a tape run needs, built once per invocation.
pub(crate) struct PipelineDependencies {
    config: Arc<MigrationConfig>,
    factory: Arc<UnitOfWorkFactory>,
    events: EventBus,
    metrics: Metrics,
}

impl PipelineDependencies {
    /// Load the lookup table and build the production collaborators.
    pub(crate) async fn build(config: Arc<MigrationConfig>, store: MigrationStore) -> AppResult<Self> {
        let lookup = NameLookupTable::load(&store)
            .await
            .map_err(AppError::pipeline("lookup.load"))?;
        let slicer = CommandSlicer::new(&config.slicer.executable)
            .map_err(AppError::pipeline("slicer.new"))?;
        let sanity_checker = config
            .active_sanity_checker()
            .map(|checker| CommandSanityChecker::new(&checker.executable))
            .transpose()
            .map_err(AppError::pipeline("sanity_checker.new"))?
            .map(|checker| Arc::new(checker) as Arc<dyn SanityChecker>);
        if sanity_checker.is_none() {
            info!("sanity check stage disabled");
        }

        let events = EventBus::new();
        let metrics = Metrics::new().map_err(AppError::telemetry("telemetry.metrics"))?;
        let collaborators = Collaborators {
            register: Arc::new(store),
            confirmer: Arc::new(TapeImportConfirmer::from_config(&config.confirmer)),
            slicer: Arc::new(slicer),
            sanity_checker,
            uploader: Arc::new(AwsCliUploader::from_config(&config.uploader)),
            events: events.clone(),
            metrics: metrics.clone(),
        };
        let lookup: Arc<dyn NameLookup> = Arc::new(lookup);
        let factory = UnitOfWorkFactory::new(Arc::clone(&config), collaborators, lookup)
            .map_err(|source| AppError::Linker { source })?;

        Ok(Self {
            config,
            factory: Arc::new(factory),
            events,
            metrics,
        })
    }
}

/// Entry point for the tapemig boot sequence.
///
/// # Errors
///
/// Returns an error if configuration, logging, the store or the run itself
/// fails. Individual tape failures are not errors.
pub async fn run_app(cli: Cli) -> AppResult<()> {
    let config = load_config(&cli.config).map_err(AppError::config("config.load"))?;
    let label = log_label(&config.logging, &cli.command);
    let log_file = init_logging(&logging_config(&config.logging, &label))
        .map_err(AppError::telemetry("telemetry.init"))?;
    info!(
        command = cli.command.label(),
        config = %cli.config.display(),
        build_sha = build_sha(),
        log_file = ?log_file,
        "tapemig starting"
    );

    let tables = TableNames {
        mapping: config.database.mapping_table.clone(),
        register: config.database.register_table.clone(),
    };
    let store = MigrationStore::connect(
        &config.database.url,
        config.database.max_connections,
        &tables,
    )
    .await
    .map_err(AppError::data("store.connect"))?;
    run_migrations(store.pool())
        .await
        .map_err(AppError::data("store.migrate"))?;

    match cli.command {
        Command::Migrate => {
            info!("schema migrations applied");
            Ok(())
        }
        Command::Status(args) => print_status(&store, &args).await,
        Command::Run => {
            let deps = PipelineDependencies::build(Arc::new(config), store).await?;
            run_all(&deps).await
        }
        Command::Process(args) => {
            let deps = PipelineDependencies::build(Arc::new(config), store).await?;
            process_one(&deps, &args).await;
            Ok(())
        }
    }
}

async fn run_all(deps: &PipelineDependencies) -> AppResult<()> {
    let event_log = EventLog::spawn(&deps.events);
    let executor = ParallelTapeExecutor::from_config(&deps.config, Arc::clone(&deps.factory));
    let result = executor.run().await;
    event_log.finish(&deps.events).await;
    log_metrics(&deps.metrics);

    let summary = result.map_err(|source| AppError::Executor { source })?;
    info!(
        discovered = summary.discovered,
        dispatched = summary.dispatched,
        "tapemig run complete"
    );
    Ok(())
}

async fn process_one(deps: &PipelineDependencies, args: &ProcessArgs) {
    let location = tape_location(&deps.config, args);
    let event_log = EventLog::spawn(&deps.events);
    deps.factory
        .create(&args.tape_name)
        .process(&args.tape_name, &location)
        .await;
    event_log.finish(&deps.events).await;
    log_metrics(&deps.metrics);
}

async fn print_status(store: &MigrationStore, args: &StatusArgs) -> AppResult<()> {
    let status = store
        .fetch_tape_status(&args.tape_name)
        .await
        .map_err(AppError::data("store.fetch_tape_status"))?;
    match status {
        Some(status) => println!("{}: {status}", args.tape_name),
        None => println!("{}: not registered", args.tape_name),
    }
    Ok(())
}

fn tape_location(config: &MigrationConfig, args: &ProcessArgs) -> PathBuf {
    args.tape_location
        .clone()
        .unwrap_or_else(|| config.executor.input_directory.join(&args.tape_name))
}

fn log_label(settings: &LoggingSettings, command: &Command) -> String {
    match command {
        Command::Process(args) => format!("{}_{}", settings.label, args.tape_name),
        _ => settings.label.clone(),
    }
}

fn logging_config<'a>(settings: &'a LoggingSettings, label: &'a str) -> LoggingConfig<'a> {
    LoggingConfig {
        level: &settings.level,
        format: LogFormat::from_name(settings.format.as_deref()),
        directory: settings.directory.as_deref(),
        label,
        ..LoggingConfig::default()
    }
}

/// Background task mirroring bus events into the debug log.
struct EventLog {
    handle: JoinHandle<usize>,
    shutdown: oneshot::Sender<EventId>,
}

impl EventLog {
    fn spawn(events: &EventBus) -> Self {
        let mut stream = events.subscribe();
        let (shutdown, mut stop_at) = oneshot::channel::<EventId>();
        let handle = tokio::spawn(async move {
            let mut logged = 0_usize;
            let mut last_seen: EventId = 0;
            let mut target: Option<EventId> = None;
            loop {
                if target.is_some_and(|target| last_seen >= target) {
                    break;
                }
                tokio::select! {
                    received = &mut stop_at, if target.is_none() => {
                        // A dropped sender means nobody waits for the drain.
                        target = Some(received.unwrap_or(0));
                    }
                    item = stream.next() => match item {
                        Some(Ok(envelope)) => {
                            last_seen = envelope.id;
                            logged += 1;
                            debug!(
                                event_id = envelope.id,
                                kind = envelope.event.kind(),
                                tape = envelope.event.tape().unwrap_or_default(),
                                "pipeline event"
                            );
                        }
                        Some(Err(err)) => warn!(error = %err, "event log lagged behind"),
                        None => break,
                    }
                }
            }
            logged
        });
        Self { handle, shutdown }
    }

    /// Log every event published so far, then stop. Returns how many events
    /// the task logged over its lifetime.
    async fn finish(self, events: &EventBus) -> usize {
        let target = events.last_event_id().unwrap_or(0);
        let _ = self.shutdown.send(target);
        match self.handle.await {
            Ok(logged) => logged,
            Err(err) => {
                warn!(error = %err, "event log task failed");
                0
            }
        }
    }
}

fn log_metrics(metrics: &Metrics) {
    let snapshot = metrics.snapshot();
    info!(
        tapes_finished = snapshot.tapes_finished,
        tapes_failed = snapshot.tapes_failed,
        links_created = snapshot.links_created,
        links_failed = snapshot.links_failed,
        "metrics snapshot"
    );
    match metrics.render() {
        Ok(rendered) => debug!(metrics = %rendered, "metrics exposition"),
        Err(err) => warn!(error = %error_chain(&err), "failed to render metrics"),
    }
}
