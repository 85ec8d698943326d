//! Application orchestration and command routing.
//!
//! Parses the command line and delegates to the command handlers.

use crate::commands;
use crate::logging;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

/// A microphone-driven half-circle waveform display
#[derive(Parser)]
#[command(name = "sound-displayer")]
#[command(version)]
#[command(about = "A microphone-driven half-circle waveform display")]
#[command(long_about = "A microphone-driven half-circle waveform display.\n\nThe microphone is sampled on a background thread; every 180 loudness values\nbecome one frame, drawn as a half circle that swells with your voice.\n\nDEFAULT COMMAND:\n    If no command is specified, 'show' is used by default.\n\nEXAMPLES:\n    # Show the live waveform from the configured microphone\n    $ sound-displayer\n\n    # Drive the display from a recording, looping forever\n    $ sound-displayer --input speech.wav --loop\n\n    # Print 20 frame summaries without the display\n    $ sound-displayer probe --frames 20")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/sound-displayer/sound-displayer.toml\n    Logs:               ~/.local/state/sound-displayer/sound-displayer.log.*"
)]
struct Cli {
    /// Read audio from a WAV file instead of the microphone (show default command)
    #[arg(short, long, value_name = "FILE", global = true)]
    input: Option<PathBuf>,

    /// Loop the input file instead of stopping at its end
    #[arg(short, long = "loop", global = true)]
    looping: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the live waveform display (default)
    ///
    /// Space freezes the drawn waveform, Enter/Escape/q quits.
    #[command(visible_alias = "s")]
    Show,

    /// Print a loudness summary for each received frame
    ///
    /// Runs the sampler without the display. Useful for checking that the
    /// input produces sensible values.
    #[command(visible_alias = "p")]
    Probe {
        /// Number of frames to print (0 = until Ctrl+C)
        #[arg(short, long, default_value_t = 10)]
        frames: usize,
    },

    /// Open configuration file in your preferred editor
    ///
    /// Uses $EDITOR environment variable or falls back to nano/vi.
    #[command(visible_alias = "c")]
    Config,

    /// List available audio input devices
    ///
    /// Shows device IDs, names, and whether they support the configured
    /// capture format.
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries from the application
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   sound-displayer completions bash > sound-displayer.bash
    ///   sound-displayer completions zsh > _sound-displayer
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the application based on command-line arguments.
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Commands that don't need logging
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "sound-displayer", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => {
            if let Err(e) = commands::handle_list_devices() {
                eprintln!("Error: {e}");
                process::exit(1);
            }
            return Ok(());
        }
        Some(Commands::Logs) => {
            if let Err(e) = commands::handle_logs() {
                eprintln!("Error: {e}");
                process::exit(1);
            }
            return Ok(());
        }
        _ => {}
    }

    logging::init_logging()?;

    match cli.command {
        None | Some(Commands::Show) => {
            commands::handle_show(cli.input, cli.looping)?;
        }
        Some(Commands::Probe { frames }) => {
            commands::handle_probe(frames, cli.input, cli.looping).await?;
        }
        Some(Commands::Config) => {
            commands::handle_config()?;
        }
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}
