//! CellSim - headless cell-growth simulation runner.
//!
//! ## Usage
//!
//! ```bash
//! # 300 ticks on the default 2x2 thread layout
//! cargo run -p ringkernel-cellsim --bin cellsim -- --ticks 300
//!
//! # Work-stealing scheduler, fixed seed, medicine injected before tick 10
//! cargo run -p ringkernel-cellsim --bin cellsim -- --scheduler range2d --seed 7 --inject 512,384@10
//!
//! # Type "x y" lines on stdin to inject medicine, "q" to quit
//! cargo run -p ringkernel-cellsim --bin cellsim -- --interactive
//! ```

use std::io::BufRead;
use std::sync::mpsc;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use ringkernel_cellsim::scheduler::{QuadrantLayout, RangeConfig};
use ringkernel_cellsim::simulation::{DEFAULT_CANCER_FRACTION, DEFAULT_HEIGHT, DEFAULT_TICKS_PER_SECOND, DEFAULT_WIDTH};
use ringkernel_cellsim::{
    Consistency, EmulatedBackend, InputEvent, InputSource, LogRenderer, SchedulerKind,
    ScriptedInput, SimParams, SimulationContext, TickDriver,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SchedulerArg {
    /// Single-threaded reference
    Sequential,
    /// Fixed partitions, one thread each
    Quadrant,
    /// Work-stealing 2D range
    Range2d,
    /// Kernel offload on the host emulator
    OffloadEmulated,
    /// Kernel offload on a WebGPU device
    OffloadWgpu,
}

/// Parallel 2D cell-growth simulation
#[derive(Parser, Debug)]
#[command(name = "cellsim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Grid width in cells
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    width: usize,

    /// Grid height in cells
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    height: usize,

    /// Stop after this many ticks (runs until quit if omitted)
    #[arg(short, long)]
    ticks: Option<u64>,

    /// RNG seed for the initial grid
    #[arg(short, long)]
    seed: Option<u64>,

    /// Minimum fraction of cells seeded as Cancer
    #[arg(short, long, default_value_t = DEFAULT_CANCER_FRACTION)]
    fraction: f64,

    /// Ticks per second (0 runs unpaced)
    #[arg(short = 'r', long, default_value_t = DEFAULT_TICKS_PER_SECOND)]
    tick_rate: u32,

    /// Tick scheduler
    #[arg(long, value_enum, default_value = "quadrant")]
    scheduler: SchedulerArg,

    /// Partition layout for the quadrant scheduler
    #[arg(long, default_value = "2x2")]
    layout: QuadrantLayout,

    /// Leaf size for the range2d scheduler
    #[arg(long)]
    grain: Option<usize>,

    /// Dedicated pool size for the range2d scheduler
    #[arg(long)]
    threads: Option<usize>,

    /// Read neighbours from the previous generation on host schedulers
    #[arg(long)]
    generational: bool,

    /// Inject medicine before a tick: x,y@tick (repeatable)
    #[arg(short, long, value_parser = parse_inject)]
    inject: Vec<(u64, usize, usize)>,

    /// Read "x y" injections and "q" from stdin
    #[arg(long)]
    interactive: bool,

    /// Log counts every N ticks
    #[arg(long, default_value_t = 30)]
    log_every: u64,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_inject(s: &str) -> Result<(u64, usize, usize), String> {
    let (coords, tick) = s
        .split_once('@')
        .ok_or_else(|| format!("expected x,y@tick, got '{}'", s))?;
    let (x, y) = coords
        .split_once(',')
        .ok_or_else(|| format!("expected x,y@tick, got '{}'", s))?;
    let number = |part: &str| {
        part.trim()
            .parse::<usize>()
            .map_err(|e| format!("'{}': {}", part, e))
    };
    let tick = tick
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("'{}': {}", tick, e))?;
    Ok((tick, number(x)?, number(y)?))
}

/// Scripted events merged with lines typed on stdin.
struct CliInput {
    scripted: ScriptedInput,
    stdin: Option<mpsc::Receiver<InputEvent>>,
}

impl InputSource for CliInput {
    fn poll(&mut self) -> Vec<InputEvent> {
        let mut events = self.scripted.poll();
        if let Some(rx) = self.stdin.as_mut() {
            events.extend(rx.poll());
        }
        events
    }
}

fn spawn_stdin_reader() -> anyhow::Result<mpsc::Receiver<InputEvent>> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("cellsim-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                let line = line.trim();
                let event = if line.eq_ignore_ascii_case("q") || line.eq_ignore_ascii_case("quit") {
                    InputEvent::Quit
                } else {
                    let mut parts = line.split_whitespace().map(str::parse::<usize>);
                    match (parts.next(), parts.next()) {
                        (Some(Ok(x)), Some(Ok(y))) => InputEvent::Inject { x, y },
                        _ => {
                            tracing::warn!("Ignoring input '{}': expected \"x y\" or \"q\"", line);
                            continue;
                        }
                    }
                };
                let quit = event == InputEvent::Quit;
                if tx.send(event).is_err() || quit {
                    break;
                }
            }
        })
        .context("failed to start stdin reader")?;
    Ok(rx)
}

#[cfg(feature = "wgpu")]
fn wgpu_context(params: SimParams) -> anyhow::Result<SimulationContext> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .context("failed to build async runtime")?;
    let backend = runtime.block_on(ringkernel_cellsim::WgpuBackend::new())?;
    Ok(SimulationContext::with_backend(params, backend)?)
}

#[cfg(not(feature = "wgpu"))]
fn wgpu_context(_params: SimParams) -> anyhow::Result<SimulationContext> {
    bail!("offload-wgpu requires building with --features wgpu")
}

fn build_context(cli: &Cli) -> anyhow::Result<SimulationContext> {
    let mut params = SimParams::new(cli.width, cli.height).with_cancer_fraction(cli.fraction);
    if let Some(seed) = cli.seed {
        params = params.with_seed(seed);
    }
    if cli.tick_rate > 0 {
        params = params.with_tick_rate(cli.tick_rate);
    }
    if cli.generational {
        params = params.with_consistency(Consistency::Generational);
    }

    let kind = match cli.scheduler {
        SchedulerArg::Sequential => SchedulerKind::Sequential,
        SchedulerArg::Quadrant => SchedulerKind::Quadrant(cli.layout),
        SchedulerArg::Range2d => SchedulerKind::Range2d(RangeConfig {
            grain: cli.grain,
            threads: cli.threads,
        }),
        SchedulerArg::OffloadEmulated => {
            return Ok(SimulationContext::with_backend(params, EmulatedBackend::new())?)
        }
        SchedulerArg::OffloadWgpu => return wgpu_context(params),
    };
    Ok(SimulationContext::new(params, &kind)?)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(format!("ringkernel_cellsim={}", level).parse()?),
        )
        .init();

    if cli.ticks.is_none() && !cli.interactive {
        bail!("nothing would stop the run: pass --ticks or --interactive");
    }

    tracing::info!("Starting RingKernel CellSim...");
    let mut ctx = build_context(&cli)?;

    let mut input = CliInput {
        scripted: cli
            .inject
            .iter()
            .fold(ScriptedInput::new(), |script, &(tick, x, y)| script.inject(tick, x, y)),
        stdin: if cli.interactive {
            Some(spawn_stdin_reader()?)
        } else {
            None
        },
    };
    let mut renderer = LogRenderer::new(cli.log_every);

    let driver = if cli.tick_rate > 0 {
        TickDriver::new(ctx.params().tick_period)
    } else {
        TickDriver::unpaced()
    };

    let summary = driver.run(&mut ctx, &mut renderer, &mut input, cli.ticks)?;
    ctx.shutdown();

    let per_tick = summary.per_tick();
    println!(
        "{} ticks in {:.2?} ({:.2?}/tick), {} stimuli applied, {} dropped",
        summary.ticks, summary.elapsed, per_tick, summary.injected, summary.dropped
    );
    println!("{}", summary.counts);
    Ok(())
}
