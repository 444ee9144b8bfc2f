mod config;
mod corners;
mod geometry;
mod grid;
mod input;
mod layout;
mod raster;
mod render;
mod selection;
mod window;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{ArgAction, Parser};
use config::Config;
use corners::Corner;
use input::{DisplayRef, ParsedInput};
use layout::Layout;
use render::TextRenderer;
use selection::{Outcome, SelectionController};
use serde_json::{json, Value};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::Instant;

const INPUT_HELP: &str = r##"Input format (one entry per line, read until EOF):

  <image> <action...>     show <image> in the grid; print <action...> when clicked
  "<label>" <action...>   render <label> as text instead of loading a file
  @NW <action...>         action for a click near a screen corner (@NW @NE @SW @SE)

Underscores in <image>/<label> are read as spaces. Text after '#' is ignored.
"##;

const DEFAULT_LAYOUT_SIZE: &str = "1920x1080";

#[derive(Parser, Debug)]
#[command(
    name = "appchoo",
    version,
    about = "Full-screen application chooser: click an image, get its action on stdout",
    after_help = INPUT_HELP
)]
struct Cli {
    /// Seconds until the default action is chosen (0 disables the countdown)
    #[arg(long, default_value_t = 0)]
    timeout: u64,
    /// Action printed when the countdown expires
    #[arg(long = "default", default_value = "")]
    default_action: String,
    /// Prompt drawn across the top of the screen
    #[arg(long)]
    prompt: Option<String>,
    /// TrueType/OpenType font for text labels and the prompt
    #[arg(long)]
    font: Option<PathBuf>,
    /// Keep the mouse cursor visible
    #[arg(long, action = ArgAction::SetTrue)]
    show_cursor: bool,
    /// Read entries from a file instead of stdin (- for stdin)
    #[arg(long)]
    input: Option<String>,
    /// Maximum number of grid entries read from the input
    #[arg(long, default_value_t = input::DEFAULT_MAX_RECORDS)]
    max_items: usize,
    /// Open a WIDTHxHEIGHT window instead of going fullscreen
    #[arg(long)]
    size: Option<String>,
    /// Print the computed layout as JSON and exit without opening a window
    #[arg(long, action = ArgAction::SetTrue)]
    print_layout: bool,
}

impl Cli {
    fn to_config(&self) -> Result<Config> {
        let window_size = self.size.as_deref().map(config::parse_size).transpose()?;
        Ok(Config {
            show_cursor: self.show_cursor,
            timeout: config::timeout_from_secs(self.timeout),
            default_action: self.default_action.clone(),
            prompt: self.prompt.clone().filter(|p| !p.trim().is_empty()),
            font: self.font.clone(),
            max_items: self.max_items,
            window_size,
        })
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = cli.to_config()?;
    let parsed = read_input(cli.input.as_deref(), config.max_items)?;

    if cli.print_layout {
        let (w, h) = match config.window_size {
            Some(size) => size,
            None => config::parse_size(DEFAULT_LAYOUT_SIZE)?,
        };
        let layout = Layout::new(w as i32, h as i32, parsed.records.len(), config.prompt.is_some());
        println!("{}", serde_json::to_string_pretty(&layout_report(&parsed, &layout)?)?);
        return Ok(0);
    }

    let outcome = choose(&config, parsed)?;
    emit(&outcome)?;
    Ok(outcome.exit_code())
}

fn read_input(path: Option<&str>, max_items: usize) -> Result<ParsedInput> {
    let reader: Box<dyn BufRead> = match path {
        None | Some("-") => Box::new(io::stdin().lock()),
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("failed to open input: {path}"))?,
        )),
    };
    input::parse_input(reader, max_items)
}

/// Open the window, draw the grid once and wait for a decision.
fn choose(config: &Config, parsed: ParsedInput) -> Result<Outcome> {
    let started = Instant::now();
    let mut window = window::PickerWindow::open(config.show_cursor, config.window_size)
        .context("failed to set up the display")?;
    let (w, h) = window.size();
    let layout = Layout::new(w as i32, h as i32, parsed.records.len(), config.prompt.is_some());

    let text = TextRenderer::load(config.font.as_deref());
    let frame = render::compose(&layout, &parsed.records, &text, config.prompt.as_deref());
    window.present(frame)?;

    let mut controller =
        SelectionController::new(config, layout, &parsed.records, parsed.corners, started);
    Ok(selection::run_until_resolved(&mut controller, &mut window))
}

fn emit(outcome: &Outcome) -> Result<()> {
    write_action(&mut io::stdout().lock(), outcome)
}

/// The action bytes go out exactly as read, with no newline added.
fn write_action<W: Write>(out: &mut W, outcome: &Outcome) -> Result<()> {
    if let Some(action) = outcome.action() {
        out.write_all(action).context("failed to write action")?;
        out.flush().context("failed to flush stdout")?;
    }
    Ok(())
}

fn layout_report(parsed: &ParsedInput, layout: &Layout) -> Result<Value> {
    let items: Vec<Value> = parsed
        .records
        .iter()
        .zip(&layout.cells)
        .enumerate()
        .map(|(index, (record, cell))| {
            let kind = match record.display {
                DisplayRef::Path(_) => "image",
                DisplayRef::Label(_) => "label",
            };
            json!({
                "index": index,
                "kind": kind,
                "display": record.display.describe(),
                "action": String::from_utf8_lossy(&record.action),
                "cell": cell,
            })
        })
        .collect();
    let corners: serde_json::Map<String, Value> = Corner::ALL
        .into_iter()
        .map(|corner| {
            let action = parsed
                .corners
                .get(corner)
                .map_or(Value::Null, |a| json!(String::from_utf8_lossy(a)));
            (corner.tag().to_string(), action)
        })
        .collect();
    let warnings: Vec<String> = parsed.warnings.iter().map(ToString::to_string).collect();

    Ok(json!({
        "generated_at": Utc::now().to_rfc3339(),
        "layout": serde_json::to_value(layout)?,
        "items": items,
        "corners": corners,
        "warnings": warnings,
    }))
}
