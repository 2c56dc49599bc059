mod protocol;

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use azrael::broker::Broker;
use azrael::events::EventBus;
use azrael::grid::ForceGrid;
use azrael::leonard::{Leonard, LeonardConfig};
use azrael::log::{debug, info, warn, LevelFilter};
use azrael::physics::RapierIntegrator;
use azrael::store::Datastore;
use azrael::worker::{WorkerPool, WorkerPoolConfig};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use protocol::{dispatch, Request, Response};

/// Workers rebuild their integrator after this many packages, the same way
/// the standalone worker processes used to restart.
const WORKER_RECYCLE_AFTER: u64 = 512;

#[derive(Parser, Debug)]
#[command(author, version, about = "Azrael physics simulation server", long_about = None)]
struct Args {
    /// Log level: off, error, warn, info, debug or trace.
    #[arg(long, default_value = "info")]
    loglevel: String,
    /// Port of the JSON client API.
    #[arg(long, default_value_t = 5555)]
    port: u16,
    /// Do not start the built-in viewer.
    #[arg(long, default_value_t = false)]
    no_viewer: bool,
    /// Remove all objects every N seconds (0 disables the periodic reset).
    #[arg(long, default_value_t = 0)]
    reset_interval: u64,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = match args.loglevel.parse::<LevelFilter>() {
        Ok(filter) => filter,
        Err(_) => {
            eprintln!("unknown log level `{}`", args.loglevel);
            return ExitCode::FAILURE;
        }
    };
    azrael::log::init(filter);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            azrael::log::error!("fatal: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let store = Arc::new(Datastore::new());
    let grid = Arc::new(ForceGrid::new(1.0)?);
    let bus = EventBus::new();

    let workers = num_cpus::get().saturating_sub(2).max(1);
    let pool = WorkerPool::new(
        WorkerPoolConfig {
            workers,
            recycle_after: Some(WORKER_RECYCLE_AFTER),
        },
        Box::new(|| Box::new(RapierIntegrator::new())),
    );
    info!("starting worker pool with {workers} workers");

    let mut leonard = Leonard::new(LeonardConfig::default(), &store, bus, grid, pool)
        .context("unable to initialize the tick loop")?;
    let stop = leonard.stop_handle();
    let leonard_thread = std::thread::Builder::new()
        .name("azrael-leonard".into())
        .spawn(move || leonard.run())
        .context("unable to spawn the tick loop thread")?;

    let broker = Broker::new(store).context("unable to initialize the broker")?;

    if args.no_viewer {
        info!("viewer disabled");
    }
    if args.reset_interval > 0 {
        spawn_reset_thread(
            broker.clone(),
            Duration::from_secs(args.reset_interval),
            stop.clone(),
        );
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("unable to start the I/O runtime")?;
    let result = runtime.block_on(serve(broker, args.port));

    stop.store(true, Ordering::Relaxed);
    let _ = leonard_thread.join();
    result
}

/// Demo-style world reset: periodically remove every live object through the
/// regular command path, so the tick machinery stays authoritative.
fn spawn_reset_thread(broker: Broker, interval: Duration, stop: Arc<AtomicBool>) {
    std::thread::Builder::new()
        .name("azrael-reset".into())
        .spawn(move || {
            let mut elapsed = Duration::ZERO;
            let step = Duration::from_secs(1);
            while !stop.load(Ordering::Relaxed) {
                std::thread::sleep(step.min(interval));
                elapsed += step;
                if elapsed < interval {
                    continue;
                }
                elapsed = Duration::ZERO;
                match broker.get_all_object_ids().and_then(|ids| {
                    let count = ids.len();
                    broker.remove_objects(&ids).map(|_| count)
                }) {
                    Ok(count) if count > 0 => info!("periodic reset: removing {count} objects"),
                    Ok(_) => {}
                    Err(err) => warn!("periodic reset failed: {err}"),
                }
            }
        })
        .expect("unable to spawn reset thread");
}

async fn serve(broker: Broker, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("unable to bind port {port}"))?;
    info!("client API listening on port {port}");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received; shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (socket, peer) = accepted.context("accept failed")?;
                debug!("client connected: {peer}");
                let broker = broker.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_client(broker, socket).await {
                        debug!("client {peer} dropped: {err}");
                    }
                });
            }
        }
    }
}

/// One JSON document per line in, one per line out.
async fn handle_client(broker: Broker, socket: TcpStream) -> anyhow::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => dispatch(&broker, request),
            Err(err) => Response::error(format!("malformed request: {err}")),
        };
        let mut encoded = serde_json::to_string(&response)?;
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await?;
    }
    Ok(())
}
