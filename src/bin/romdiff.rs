use ::console::Term;
use anyhow::{Context, Result};
use clap::CommandFactory;
use clap::FromArgMatches;
#[cfg(panic = "unwind")]
use human_panic::setup_panic;
use libromdiff::cli::{self, Args};
use libromdiff::config::{Config, ReadError};
use libromdiff::console_utils;
use libromdiff::message::read_messages;
use libromdiff::render::{DisplayData, Renderer, Renderers};
use libromdiff::state::ViewState;
use log::{LevelFilter, error, info, trace, warn};
use serde_json as json;
use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
};

/// The name displayed for updates that come from stdin.
const STDIN_SOURCE: &str = "stdin";

/// Return an instance of [Config] from a config file path (or the inferred default path)
///
/// If a config path isn't provided or there is some other failure, fall back to the default
/// config with the environment overrides. This will error out if a config is found but is found
/// to be an invalid config.
fn derive_config(args: &Args) -> Result<Config> {
    if args.no_config {
        info!("`no_config` specified, falling back to default config");
        return Ok(Config::from_env()?);
    }
    match Config::try_from_file(args.config.as_ref()) {
        // If the config was parsed correctly with no issue, we don't have to do anything
        Ok(config) => Ok(config),
        // If there was an error, we need to figure out whether to propagate the error or fall
        // back to the default config
        Err(e) => match e {
            // Not being able to find the default file path or not finding a file at all isn't a
            // hard error, it makes sense for us to use the default config.
            ReadError::ReadFileFailure(_) | ReadError::NoDefault => {
                warn!("{} - falling back to default config", e);
                Ok(Config::from_env()?)
            }
            // If we *do* find a config file and it doesn't parse correctly, the user should know
            // that their config is incorrect.
            ReadError::DeserializationFailure(e) => {
                error!("Failed to deserialize config file: {}", e);
                Err(anyhow::anyhow!(e))
            }
        },
    }
}

/// Render the current state and apply its side effects to the terminal.
fn draw(
    renderer: &Renderers,
    writer: &mut Term,
    source: &str,
    state: &ViewState,
    clear: bool,
) -> Result<()> {
    let frame = state.frame();
    let term_info = writer.clone();

    if clear {
        writer.clear_screen()?;
    }
    renderer.render(writer, &DisplayData::new(source, &frame), Some(&term_info))?;
    writer.flush()?;
    console_utils::apply_effect(&term_info, &frame.effect);
    Ok(())
}

/// Fold the stream of updates into the view state and render it.
fn run_viewer(args: Args, config: Config) -> Result<()> {
    // Check whether we can get the renderer up front so an invalid choice is reported before we
    // start waiting on input.
    let renderer = config.formatting.get_renderer(args.renderer.clone())?;

    let (source, reader): (String, Box<dyn BufRead>) = match args.input_path() {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            (
                path.to_string_lossy().into_owned(),
                Box::new(BufReader::new(file)) as Box<dyn BufRead>,
            )
        }
        None => (
            STDIN_SOURCE.into(),
            Box::new(io::stdin().lock()) as Box<dyn BufRead>,
        ),
    };
    info!("Reading updates from {source}");

    // Use a buffered terminal so a frame is written in one go instead of line by line.
    let mut buf_writer = Term::buffered_stdout();
    let clear = args.every_update && buf_writer.is_term();
    let mut state = ViewState::new();

    for message in read_messages(reader) {
        let message = match message {
            Ok(message) => message,
            Err(e) if e.is_recoverable() => {
                warn!("Skipping update: {e}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        trace!("Applying {message:?}");
        state = state.apply(message);

        if args.every_update {
            draw(&renderer, &mut buf_writer, &source, &state, clear)?;
        }
    }

    if !args.every_update {
        draw(&renderer, &mut buf_writer, &source, &state, false)?;
    }
    Ok(())
}

/// Serialize the default options struct to a json file and print that to stdout
fn dump_default_config() -> Result<()> {
    let config = Config::default();
    println!("{}", json::to_string_pretty(&config)?);
    Ok(())
}

/// Print shell completion scripts to `stdout`.
///
/// This is a basic wrapper for the subcommand.
fn print_shell_completion(shell: clap_complete::Shell) {
    let mut app = cli::Args::command();
    clap_complete::generate(shell, &mut app, "romdiff", &mut io::stdout());
}

fn main() -> Result<()> {
    // Set up a panic handler that will yield more human-readable errors.
    #[cfg(panic = "unwind")]
    setup_panic!();

    use cli::Command;

    let matches = Args::command().get_matches();
    let args = Args::from_arg_matches(&matches)?;

    let log_level = if args.debug {
        LevelFilter::Trace
    } else {
        LevelFilter::Off
    };
    pretty_env_logger::formatted_timed_builder()
        .filter_level(log_level)
        .init();

    // We parse the config as early as possible so users can get quick feedback if anything is off
    // with their config.
    let config = derive_config(&args)?;

    // Users can supply a command that will *not* read any updates, which we handle here
    if let Some(cmd) = args.cmd {
        match cmd {
            Command::DumpDefaultConfig => dump_default_config()?,
            Command::GenCompletion { shell } => print_shell_completion(shell),
        }
    } else {
        console_utils::set_term_colors(args.color_output);
        run_viewer(args, config)?;
    }
    Ok(())
}
