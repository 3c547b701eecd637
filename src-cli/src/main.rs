//! pinshot Command-Line Interface
//!
//! Sends capture requests and pin commands to the pinshot service,
//! starting the service when it is not running.

mod client;
mod colors;
mod commands;
mod exit_codes;

use clap::{Args, Parser, Subcommand, ValueEnum};
use exit_codes::ExitCode;
use pinshot_common::ipc::PinInput;
use pinshot_common::pin::ScrollPhase;
use pinshot_common::{CaptureMode, Rect};

/// pinshot - Screenshot and Pin CLI
#[derive(Parser, Debug)]
#[command(name = "pinshot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format for scripting
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Select an area interactively
    Gui(CaptureOptions),
    /// Capture the current screen
    Screen(CaptureOptions),
    /// Capture all screens
    Full(CaptureOptions),
    /// Manage pinned images
    Pin {
        #[command(subcommand)]
        action: PinAction,
    },
    /// Show service status
    Status,
    /// Stop the service
    Stop,
    /// Show version information
    Version,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CaptureOptions {
    /// Delay before capturing, in milliseconds (no value: configured delay)
    #[arg(short, long, value_name = "MS", num_args = 0..=1)]
    delay: Option<Option<u32>>,

    /// Save the capture to this file or directory
    #[arg(short, long)]
    path: Option<String>,

    /// Copy the capture to the clipboard
    #[arg(short, long)]
    clipboard: bool,

    /// Pin the capture on screen
    #[arg(long)]
    pin: bool,

    /// Upload the capture
    #[arg(short, long)]
    upload: bool,

    /// Print the raw PNG to stdout
    #[arg(short, long)]
    raw: bool,

    /// Print the selected geometry
    #[arg(short = 'g', long)]
    print_geometry: bool,

    /// Finish as soon as an area is selected
    #[arg(long)]
    accept_on_select: bool,

    /// Preselected area as X,Y,W,H
    #[arg(long, value_name = "X,Y,W,H", allow_hyphen_values = true)]
    region: Option<Rect>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PinAction {
    /// Pin an image file
    Open {
        /// Image to pin (PNG or JPEG)
        image: String,

        /// Window x position
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        x: i32,

        /// Window y position
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        y: i32,
    },
    /// List open pins
    List,
    /// Send a scroll wheel step
    Wheel {
        id: u64,

        /// Vertical delta (120 per notch)
        #[arg(allow_hyphen_values = true)]
        delta: i32,

        /// Hold the opacity modifier (Ctrl)
        #[arg(long)]
        modifier: bool,

        /// Touchpad scroll phase
        #[arg(long, value_enum, default_value = "no-phase")]
        phase: PhaseArg,
    },
    /// Send a pinch gesture update
    Pinch {
        id: u64,
        /// Scale since the gesture began
        total: f64,
        /// Scale at the previous update
        last: f64,
    },
    /// End the current gesture
    Finish { id: u64 },
    /// Set opacity: 0-9 (0 is opaque), up or down
    Opacity {
        id: u64,
        #[arg(value_parser = parse_opacity)]
        level: PinInput,
    },
    /// Remove the drop shadow
    HideShadow { id: u64 },
    /// Open a copy of a pin
    Clone { id: u64 },
    /// Close a pin
    Close { id: u64 },
    /// Close a pin and select its area again
    Edit { id: u64 },
    /// Save a pin's image (no path: the service's save directory)
    Save {
        id: u64,
        /// File or directory to save to
        path: Option<String>,
    },
    /// Make a pin click-through, or solid again
    Transparent {
        id: u64,
        #[arg(value_enum)]
        mode: Toggle,
    },
    /// Make every click-through pin solid again
    UnsetTransparent,
}

/// Scroll phase as given on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseArg {
    NoPhase,
    Begin,
    Update,
    End,
    Momentum,
}

impl From<PhaseArg> for ScrollPhase {
    fn from(phase: PhaseArg) -> Self {
        match phase {
            PhaseArg::NoPhase => ScrollPhase::NoPhase,
            PhaseArg::Begin => ScrollPhase::Begin,
            PhaseArg::Update => ScrollPhase::Update,
            PhaseArg::End => ScrollPhase::End,
            PhaseArg::Momentum => ScrollPhase::Momentum,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

fn parse_opacity(s: &str) -> Result<PinInput, String> {
    match s {
        "up" | "+" => Ok(PinInput::IncreaseOpacity),
        "down" | "-" => Ok(PinInput::DecreaseOpacity),
        _ => match s.parse::<u8>() {
            Ok(level) if level <= 9 => Ok(PinInput::OpacityLevel { level }),
            _ => Err(format!("expected 0-9, up or down, got '{}'", s)),
        },
    }
}

fn main() {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{}", colors::error(&format!("Failed to create Tokio runtime: {}", e)));
            std::process::exit(ExitCode::GeneralError.as_i32());
        }
    };

    let exit_code = runtime.block_on(run(cli));
    std::process::exit(exit_code.as_i32());
}

async fn run(cli: Cli) -> ExitCode {
    let output = commands::Output {
        json: cli.json,
        quiet: cli.quiet,
        verbose: cli.verbose,
    };
    match cli.command {
        Commands::Gui(options) => commands::capture(CaptureMode::Graphical, options, output).await,
        Commands::Screen(options) => commands::capture(CaptureMode::Screen, options, output).await,
        Commands::Full(options) => commands::capture(CaptureMode::Full, options, output).await,
        Commands::Pin { action } => commands::pin(action, output).await,
        Commands::Status => commands::status(output).await,
        Commands::Stop => commands::stop(output).await,
        Commands::Version => {
            commands::version(output.json);
            ExitCode::Success
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    /// Verify the CLI definition is valid
    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_gui_defaults() {
        let cli = Cli::try_parse_from(["pinshot", "gui"]).unwrap();
        assert!(!cli.json);
        assert!(!cli.quiet);
        match cli.command {
            Commands::Gui(options) => {
                assert_eq!(options.delay, None);
                assert!(options.path.is_none());
                assert!(!options.clipboard);
                assert!(!options.pin);
                assert!(options.region.is_none());
            }
            _ => panic!("Expected Gui command"),
        }
    }

    #[test]
    fn parse_capture_options() {
        let cli = Cli::try_parse_from([
            "pinshot",
            "full",
            "--delay",
            "500",
            "-p",
            "/tmp/shot.png",
            "-c",
            "--pin",
            "--upload",
            "--accept-on-select",
            "--region",
            "-10,20,300,200",
        ])
        .unwrap();
        match cli.command {
            Commands::Full(options) => {
                assert_eq!(options.delay, Some(Some(500)));
                assert_eq!(options.path.as_deref(), Some("/tmp/shot.png"));
                assert!(options.clipboard);
                assert!(options.pin);
                assert!(options.upload);
                assert!(options.accept_on_select);
                assert_eq!(options.region, Some(Rect::new(-10, 20, 300, 200)));
            }
            _ => panic!("Expected Full command"),
        }
    }

    #[test]
    fn parse_delay_without_value() {
        let cli = Cli::try_parse_from(["pinshot", "screen", "--delay"]).unwrap();
        match cli.command {
            Commands::Screen(options) => assert_eq!(options.delay, Some(None)),
            _ => panic!("Expected Screen command"),
        }
    }

    #[test]
    fn parse_bad_region() {
        let result = Cli::try_parse_from(["pinshot", "gui", "--region", "1,2,3"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_pin_open() {
        let cli =
            Cli::try_parse_from(["pinshot", "pin", "open", "a.png", "--x", "-40", "--y", "15"])
                .unwrap();
        match cli.command {
            Commands::Pin {
                action: PinAction::Open { image, x, y },
            } => {
                assert_eq!(image, "a.png");
                assert_eq!((x, y), (-40, 15));
            }
            _ => panic!("Expected Pin Open command"),
        }
    }

    #[test]
    fn parse_pin_wheel() {
        let cli = Cli::try_parse_from([
            "pinshot", "pin", "wheel", "3", "-120", "--modifier", "--phase", "update",
        ])
        .unwrap();
        match cli.command {
            Commands::Pin {
                action:
                    PinAction::Wheel {
                        id,
                        delta,
                        modifier,
                        phase,
                    },
            } => {
                assert_eq!(id, 3);
                assert_eq!(delta, -120);
                assert!(modifier);
                assert_eq!(ScrollPhase::from(phase), ScrollPhase::Update);
            }
            _ => panic!("Expected Pin Wheel command"),
        }
    }

    #[test]
    fn parse_pin_opacity() {
        let parse = |level: &str| {
            Cli::try_parse_from(["pinshot", "pin", "opacity", "1", level]).map(|cli| cli.command)
        };
        assert!(matches!(
            parse("7"),
            Ok(Commands::Pin {
                action: PinAction::Opacity {
                    level: PinInput::OpacityLevel { level: 7 },
                    ..
                }
            })
        ));
        assert!(matches!(
            parse("up"),
            Ok(Commands::Pin {
                action: PinAction::Opacity {
                    level: PinInput::IncreaseOpacity,
                    ..
                }
            })
        ));
        assert!(parse("10").is_err());
    }

    #[test]
    fn parse_pin_save() {
        let cli = Cli::try_parse_from(["pinshot", "pin", "save", "4", "out.png"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Pin {
                action: PinAction::Save { id: 4, path: Some(ref p) }
            } if p == "out.png"
        ));
        let cli = Cli::try_parse_from(["pinshot", "pin", "save", "4"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Pin {
                action: PinAction::Save { id: 4, path: None }
            }
        ));
    }

    #[test]
    fn parse_pin_transparent() {
        let cli = Cli::try_parse_from(["pinshot", "pin", "transparent", "2", "off"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Pin {
                action: PinAction::Transparent {
                    id: 2,
                    mode: Toggle::Off
                }
            }
        ));
        assert!(Cli::try_parse_from(["pinshot", "pin", "transparent", "2", "maybe"]).is_err());
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["pinshot", "pin", "list", "--json", "-q"]).unwrap();
        assert!(cli.json);
        assert!(cli.quiet);
    }

    #[test]
    fn parse_status_stop_version() {
        assert!(matches!(
            Cli::try_parse_from(["pinshot", "status"]).unwrap().command,
            Commands::Status
        ));
        assert!(matches!(
            Cli::try_parse_from(["pinshot", "stop"]).unwrap().command,
            Commands::Stop
        ));
        assert!(matches!(
            Cli::try_parse_from(["pinshot", "version"]).unwrap().command,
            Commands::Version
        ));
    }

    #[test]
    fn parse_invalid_command() {
        assert!(Cli::try_parse_from(["pinshot", "invalid"]).is_err());
        assert!(Cli::try_parse_from(["pinshot", "pin", "close"]).is_err());
    }
}
