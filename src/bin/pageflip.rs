use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "pageflip", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the book at rest as a PNG.
    Frame(FrameArgs),
    /// Replay an event script, writing one PNG per rendered frame.
    Play(PlayArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Book configuration JSON; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of pages turned before the frame is taken.
    #[arg(long, default_value_t = 0)]
    turned: usize,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Backend to use.
    #[arg(long, value_enum, default_value_t = BackendChoice::Cpu)]
    backend: BackendChoice,
}

#[derive(Parser, Debug)]
struct PlayArgs {
    /// Book configuration JSON; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Event script JSON (array of events).
    #[arg(long)]
    script: PathBuf,

    /// Directory receiving `frame_NNNNN.png` files.
    #[arg(long)]
    out_dir: PathBuf,

    /// Backend to use.
    #[arg(long, value_enum, default_value_t = BackendChoice::Cpu)]
    backend: BackendChoice,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendChoice {
    Cpu,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Play(args) => cmd_play(args),
    }
}

fn read_config(path: Option<&Path>) -> anyhow::Result<pageflip::BookConfig> {
    match path {
        Some(path) => Ok(pageflip::BookConfig::from_path(path)?),
        None => Ok(pageflip::BookConfig::default()),
    }
}

fn make_session(
    cfg: &pageflip::BookConfig,
    choice: BackendChoice,
) -> anyhow::Result<pageflip::FlipSession> {
    let pages: Vec<Box<dyn pageflip::PageContent>> = (0..cfg.pages)
        .map(|_| Box::new(pageflip::RecordedPage::default()) as Box<dyn pageflip::PageContent>)
        .collect();
    let controller =
        pageflip::PageController::new(cfg.container()?, pages, cfg.controller_opts())?;

    let kind = match choice {
        BackendChoice::Cpu => pageflip::BackendKind::Cpu,
    };
    let settings = pageflip::RenderSettings {
        clear_rgba: cfg.clear_rgba,
    };
    let backend = pageflip::create_backend(kind, &settings)?;
    Ok(pageflip::FlipSession::new(controller, backend))
}

fn write_png(path: &Path, frame: &pageflip::FrameRGBA) -> anyhow::Result<()> {
    let data = if frame.premultiplied {
        unpremultiply(&frame.data)
    } else {
        frame.data.clone()
    };
    image::save_buffer_with_format(
        path,
        &data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))
}

fn unpremultiply(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    for px in out.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
    out
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let cfg = read_config(args.config.as_deref())?;
    if args.turned > cfg.pages {
        anyhow::bail!("--turned {} exceeds page count {}", args.turned, cfg.pages);
    }
    let mut session = make_session(&cfg, args.backend)?;

    let controller = session.controller_mut();
    for _ in 0..args.turned {
        controller.turn_to_next();
    }
    let bound = pageflip::Animator::settle_tick_bound(cfg.button_speed);
    controller.run_until_idle(bound);
    // A fresh resting spread, drawn the way a resize would draw it.
    controller.resize(controller.container())?;

    let frame = session.render_now()?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    write_png(&args.out, &frame)?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_play(args: PlayArgs) -> anyhow::Result<()> {
    let cfg = read_config(args.config.as_deref())?;
    let script = std::fs::read_to_string(&args.script)
        .with_context(|| format!("read script '{}'", args.script.display()))?;
    let events = pageflip::parse_script(&script).with_context(|| "parse event script JSON")?;

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;

    let mut session = make_session(&cfg, args.backend)?;
    let mut index = 0u64;
    let stats = session.play(&events, |frame| {
        let path = args.out_dir.join(format!("frame_{index:05}.png"));
        index += 1;
        write_png(&path, &frame).map_err(pageflip::BookError::Other)
    })?;

    eprintln!(
        "wrote {} frames to {} ({} events, {} ticks)",
        stats.frames,
        args.out_dir.display(),
        stats.events,
        stats.ticks
    );
    Ok(())
}
