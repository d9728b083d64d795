//! A continuously scrolling logo loop for the terminal.
//!
//! Run with `--dir` to loop every image in a directory, `--manifest` for a
//! list of logos with links, or `--text` for plain labels.  Clicking a
//! linked logo exits and prints its link on stdout.

mod app;
mod config;
mod core;
mod ui;

use std::io::{self, stderr};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::Rect,
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use tokio::sync::mpsc;

use crate::app::{
    event::{spawn_event_reader, AppEvent},
    frames::FrameClock,
    handler::{self, Followup},
    image_runtime::{start_decoding, DecodeBatch, ImageUpdate},
    state::AppState,
};
use crate::config::AppConfig;
use crate::core::item::LoopItem;
use crate::core::loop_config::{Direction, HoverBehavior, LoopWidth};
use crate::core::manifest::ItemSource;
use crate::ui::{clip::render_clipped, layout::AppLayout, marquee::MarqueeWidget, theme::Theme};

// ───────────────────────────────────────── CLI ───────────────

#[derive(Parser, Debug)]
#[command(name = env!("CARGO_PKG_NAME"), about = "Continuously scrolling logo loop")]
struct Cli {
    /// Directory of logo images (defaults to `.`).
    #[arg(long, conflicts_with_all = ["manifest", "text"])]
    dir: Option<PathBuf>,

    /// Manifest file with one `alt | src | href | title` line per logo.
    #[arg(long, conflicts_with = "text")]
    manifest: Option<PathBuf>,

    /// Plain text item; repeat for more.
    #[arg(long = "text", value_name = "LABEL")]
    text: Vec<String>,

    /// Include hidden (dot) files when scanning a directory.
    #[arg(long)]
    hidden: bool,

    /// Speed in cells per second; negative runs the other way.
    #[arg(long, allow_hyphen_values = true)]
    speed: Option<f64>,

    /// left, right, up or down.
    #[arg(long)]
    direction: Option<Direction>,

    /// Cells after every item.
    #[arg(long)]
    gap: Option<u16>,

    /// Logo height in rows (width in columns when vertical).
    #[arg(long)]
    item_size: Option<u16>,

    /// Band width: columns (`60`) or a share of the screen (`80%`).
    #[arg(long, value_parser = parse_width)]
    width: Option<LoopWidth>,

    /// Hover behaviour: `none`, `pause` or `slow:<speed>`.
    #[arg(long, value_parser = parse_hover, conflicts_with_all = ["pause_on_hover", "hover_speed"])]
    hover: Option<HoverBehavior>,

    /// Ease to a standstill while hovered (`true` or `false`).
    #[arg(long, value_name = "BOOL")]
    pause_on_hover: Option<bool>,

    /// Speed while hovered; takes precedence over `--pause-on-hover`.
    #[arg(long, allow_hyphen_values = true)]
    hover_speed: Option<f64>,

    /// Number of bands; every other band runs the opposite way.
    #[arg(long)]
    bands: Option<usize>,

    /// Hovering any band slows all of them.
    #[arg(long)]
    sync_hover: bool,

    /// Disable the faded edges.
    #[arg(long)]
    no_fade: bool,

    /// Animation frames per second.
    #[arg(long)]
    fps: Option<u16>,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn parse_width(s: &str) -> Result<LoopWidth, String> {
    LoopWidth::parse(s).ok_or_else(|| format!("'{s}' is not a width (e.g. 60 or 80%)"))
}

fn parse_hover(s: &str) -> Result<HoverBehavior, String> {
    HoverBehavior::parse(s).ok_or_else(|| format!("'{s}' is not a hover mode (none|pause|slow:N)"))
}

impl Cli {
    /// Where items come from.  Explicit flags win; otherwise the current
    /// directory is scanned.
    fn source(&self) -> ItemSource {
        if let Some(path) = &self.manifest {
            ItemSource::Manifest(path.clone())
        } else if !self.text.is_empty() {
            ItemSource::Inline(self.text.iter().map(LoopItem::text).collect())
        } else {
            ItemSource::Directory {
                dir: self.dir.clone().unwrap_or_else(|| PathBuf::from(".")),
                show_hidden: self.hidden,
            }
        }
    }

    /// Layer command-line overrides on top of the saved configuration.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(speed) = self.speed {
            config.speed = speed.clamp(-1000.0, 1000.0);
        }
        if let Some(direction) = self.direction {
            config.direction = direction;
        }
        if let Some(gap) = self.gap {
            config.gap = gap.min(200);
        }
        if let Some(size) = self.item_size {
            config.item_size = size.clamp(1, 64);
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(hover) = self.hover {
            config.hover = hover;
        }
        if self.pause_on_hover.is_some() || self.hover_speed.is_some() {
            let speed = self.hover_speed.map(|s| s.clamp(-1000.0, 1000.0));
            config.hover = HoverBehavior::resolve(self.pause_on_hover.unwrap_or(true), speed);
        }
        if let Some(bands) = self.bands {
            config.bands = bands.clamp(1, 8);
        }
        if let Some(fps) = self.fps {
            config.fps = fps.clamp(10, 240);
        }
        if self.sync_hover {
            config.sync_hover = true;
        }
        if self.no_fade {
            config.fade.enabled = false;
        }
    }
}

// ───────────────────────────────────────── logging ───────────

fn init_tracing(log_file: Option<&PathBuf>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("cannot create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr) // never pollute stdout
                .init();
        }
    }
    Ok(())
}

// ───────────────────────────────────────── drawing ───────────

fn draw(frame: &mut Frame, state: &AppState) {
    let layout = AppLayout::from_area(frame.area());
    let page = layout.page_area;
    let scroll = state.scroll.position();

    for (i, band) in state.bands.iter().enumerate() {
        let slot = state.slot(i);
        if slot.visible_rect(page, scroll).is_none() {
            continue;
        }
        let hover = state.hover.filter(|h| h.band == i);
        let border = if hover.is_some() {
            Theme::hovered_border_style()
        } else {
            Theme::border_style()
        };
        let block = Block::default()
            .title(state.band_title(i))
            .title_style(Theme::title_style())
            .borders(Borders::ALL)
            .border_style(border);
        let widget = MarqueeWidget::new(&band.logo, &state.fitted)
            .hovered_item(hover.and_then(|h| h.item))
            .block(block);
        render_clipped(
            widget,
            slot.screen_origin(page, scroll),
            (slot.width, slot.height),
            page,
            frame.buffer_mut(),
        );
    }

    let status = Paragraph::new(state.status_text()).style(Theme::status_bar_style());
    frame.render_widget(status, layout.status_area);
}

// ───────────────────────────────────────── event loop ────────

type Backend = CrosstermBackend<io::Stderr>;

async fn run(terminal: &mut Terminal<Backend>, state: &mut AppState) -> Result<()> {
    let mut events = spawn_event_reader(Duration::from_millis(100));
    let (image_tx, mut image_rx) = mpsc::unbounded_channel::<(u64, ImageUpdate)>();
    let mut clock = FrameClock::new(state.config.fps);

    let items = state.bands.first().map(|b| b.logo.items().to_vec()).unwrap_or_default();
    let mut decoding: DecodeBatch = start_decoding(&items, state.items_generation, &image_tx);

    loop {
        state.refresh_tiles();
        terminal.draw(|frame| draw(frame, state))?;

        tokio::select! {
            biased;

            Some(event) = events.recv() => {
                match event {
                    AppEvent::Key(k) => {
                        if handler::handle_key(state, k) == Followup::Reload {
                            reload(state, &mut decoding, &image_tx);
                        }
                    }
                    AppEvent::Mouse(m) => handler::handle_mouse(state, m),
                    AppEvent::Resize(w, h) => state.resize(w, h),
                    AppEvent::Focus(focused) => state.set_focus(focused),
                }
            }

            Some((generation, update)) = image_rx.recv() => {
                // Drain everything queued so a burst of decodes costs one redraw.
                state.apply_image(generation, update);
                while let Ok((generation, update)) = image_rx.try_recv() {
                    state.apply_image(generation, update);
                }
            }

            timestamp = clock.tick(), if state.wants_frame() => {
                state.frame(timestamp);
            }
        }

        if state.should_quit {
            break;
        }
    }

    decoding.request_cancel();
    Ok(())
}

/// Re-read the item source and restart decoding for the new set.
fn reload(
    state: &mut AppState,
    decoding: &mut DecodeBatch,
    image_tx: &mpsc::UnboundedSender<(u64, ImageUpdate)>,
) {
    match state.source.load() {
        Ok(items) if items.is_empty() => {
            state.status_message = Some(format!("No logos in {}", state.source.describe()));
        }
        Ok(items) => {
            tracing::debug!(generation = decoding.generation(), "cancelling decode batch");
            decoding.request_cancel();
            let generation = state.replace_items(items.clone());
            *decoding = start_decoding(&items, generation, image_tx);
            state.relayout();
            tracing::info!(count = items.len(), generation, "items reloaded");
            state.status_message = Some(format!("Reloaded {} items", items.len()));
        }
        Err(e) => {
            tracing::warn!(error = %e, "reload failed");
            state.status_message = Some(format!("Reload failed: {e}"));
        }
    }
}

// ───────────────────────────────────────── main ─────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_ref())?;

    let mut config = AppConfig::load();
    cli.apply(&mut config);

    let source = cli.source();
    let items = source
        .load()
        .with_context(|| format!("cannot load logos from {}", source.describe()))?;
    if items.is_empty() {
        bail!("no logos found in {}", source.describe());
    }

    // ── terminal setup ────────────────────────────────────────
    enable_raw_mode()?;
    let mut stderr_handle = stderr();
    execute!(
        stderr_handle,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableFocusChange
    )?;
    let backend = CrosstermBackend::new(stderr());
    let mut terminal = Terminal::new(backend)?;

    let size = terminal.size()?;
    let mut state = AppState::new(config, source, items, Rect::new(0, 0, size.width, size.height));
    state.mount();

    let result = run(&mut terminal, &mut state).await;
    state.unmount();

    // ── teardown ──────────────────────────────────────────────
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableFocusChange
    )?;
    terminal.show_cursor()?;
    result?;

    if let Some(href) = &state.selected_href {
        println!("{href}");
    }

    Ok(())
}
