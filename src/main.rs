use std::fs;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::{Duration, Instant};

use clap::{Args as ClapArgs, Parser, Subcommand};
use colored::Colorize;
use hotwatch::notify::Event;
use hotwatch::{
    blocking::{Flow, Hotwatch},
    EventKind,
};
use miette::{bail, IntoDiagnostic, Result};

use hydrazen::term::{self, LiveTerminal};
use hydrazen::{Air, AsmParser, Clock, Direction, HeldKeys, Machine, Output, SymbolTable};

/// Presentation refresh rate, independent of the machine clock.
const FRAME_RATE: f64 = 60.0;

/// Hydrazen is an assembler and emulator for the Hydra 8-bit fantasy console.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.hydra2` file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run text `.hydra2` or binary `.bin` file and output to terminal
    Run(RunOptions),
    /// Create binary `.bin` file to run later
    Compile {
        /// `.hydra2` file to compile
        name: PathBuf,
        /// Destination to output `.bin` file
        dest: Option<PathBuf>,
    },
    /// Check a `.hydra2` file without running or outputting binary
    Check {
        /// File to check
        name: PathBuf,
    },
    /// Print the binary encoding of every instruction, one per line
    Listing {
        /// `.hydra2` file to list
        name: PathBuf,
        /// Include addresses, source lines and disassembly
        #[arg(short, long)]
        annotate: bool,
    },
    /// Place a watch on a `.hydra2` file to receive constant assembler updates
    Watch {
        /// `.hydra2` file to watch
        name: PathBuf,
    },
}

#[derive(ClapArgs)]
struct RunOptions {
    /// `.hydra2` or `.bin` file to run
    name: PathBuf,
    /// Clock frequency in cycles per second [default: $HYDRAZEN_HZ or 60]
    #[arg(long)]
    hz: Option<f64>,
    /// Stop after this many seconds if the program has not halted
    #[arg(short, long)]
    timeout: Option<f64>,
    /// Keep a direction held for the whole run (up, left, down, right)
    #[arg(long)]
    hold: Vec<Direction>,
    /// Draw every frame in the terminal and read arrow keys
    #[arg(short, long)]
    live: bool,
    /// Print registers and flags after the run
    #[arg(short, long)]
    dump: bool,
    /// Produce minimal output, suited for blackbox tests
    #[arg(short, long)]
    minimal: bool,
}

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    hydrazen::env::init();
    env_logger::init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(hydrazen::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    if let Some(command) = args.command {
        match command {
            Command::Run(options) => run(options),
            Command::Compile { name, dest } => {
                file_message(Green, "Assembling", &name);
                let (air, _) = assemble(&name)?;
                let program = air.emit();

                let out_file_name = dest.unwrap_or_else(|| name.with_extension("bin"));
                fs::write(&out_file_name, &program).into_diagnostic()?;

                message(
                    Green,
                    "Finished",
                    &format!("emit binary ({} bytes)", program.len()),
                );
                file_message(Green, "Saved", &out_file_name);
                Ok(())
            }
            Command::Check { name } => {
                file_message(Green, "Checking", &name);
                let (air, _) = assemble(&name)?;
                if air.is_empty() {
                    message(Cyan, "Note", "file contains no instructions");
                }
                message(Green, "Success", "no errors found!");
                Ok(())
            }
            Command::Listing { name, annotate } => {
                let (air, symbols) = assemble(&name)?;
                if annotate {
                    print!("{}", air.annotated_listing());
                    print!("{}", symbol_listing(&symbols));
                } else {
                    print!("{}", air.listing());
                }
                Ok(())
            }
            Command::Watch { name } => watch(name),
        }
    } else if let Some(path) = args.path {
        run(RunOptions {
            name: path,
            hz: None,
            timeout: None,
            hold: Vec::new(),
            live: false,
            dump: false,
            minimal: false,
        })
    } else {
        println!("\n~ hydrazen v{VERSION} ~");
        println!("{}", LOGO.truecolor(120, 200, 255).bold());
        println!("{SHORT_INFO}");
        std::process::exit(0);
    }
}

#[allow(unused)]
enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

fn message(color: MsgColor, left: &str, right: &str) {
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

fn run(options: RunOptions) -> Result<()> {
    let minimal = options.minimal || hydrazen::env::is_minimal_forced();
    Output::set_minimal(minimal);
    if minimal {
        colored::control::set_override(false);
    }

    let name = &options.name;
    let program = match name.extension().and_then(|ext| ext.to_str()) {
        Some("hydra2") => {
            file_message(MsgColor::Green, "Assembling", name);
            assemble(name)?.0.emit()
        }
        Some("bin") => {
            file_message(MsgColor::Green, "Loading", name);
            fs::read(name).into_diagnostic()?
        }
        Some(_) => bail!("File has unknown extension. Exiting..."),
        None => bail!("File has no extension. Exiting..."),
    };
    let mut machine = Machine::with_program(&program)?;

    let hz = options.hz.unwrap_or_else(hydrazen::env::default_hz);
    let mut clock = Clock::new(hz)?;
    let timeout = match options.timeout {
        Some(secs) => match Duration::try_from_secs_f64(secs) {
            Ok(limit) => Some(limit),
            Err(_) => bail!("Timeout must be a non-negative number of seconds, found {secs}."),
        },
        None => None,
    };
    let held = options.hold.iter().copied().collect::<HeldKeys>();

    message(MsgColor::Green, "Running", &format!("emitted binary at {hz} Hz"));
    let frame = Duration::from_secs_f64(1.0 / FRAME_RATE);
    let started = Instant::now();
    let timed_out = || timeout.is_some_and(|limit| started.elapsed() >= limit);

    if options.live {
        let mut screen = LiveTerminal::enter()?;
        loop {
            let input = term::poll_keys(frame)?;
            if input.quit || timed_out() {
                break;
            }
            if input.reset {
                machine.reset();
                machine.load(&program)?;
                clock = Clock::new(hz)?;
            }
            let direction = if options.hold.is_empty() {
                input.held.direction()
            } else {
                held.direction()
            };
            machine.set_input(direction);
            clock.tick(&mut machine);

            let mut text = Output::render_frame(&machine);
            let status = if machine.is_halted() {
                "halted"
            } else {
                "running"
            };
            let status = format!(
                "{status}, {} cells lit, press r to restart or q to exit",
                machine.screen().lit_count()
            );
            text.push_str(&format!("{}\n{status}\n", clock.stats()));
            screen.draw(&text)?;
        }
    } else {
        machine.set_input(held.direction());
        loop {
            clock.tick(&mut machine);
            if machine.is_halted() || timed_out() {
                break;
            }
            sleep(frame);
        }
        print!("{}", Output::render_frame(&machine));
    }

    if options.dump {
        print!("{}", Output::render_registers(&machine));
    }

    let stats = clock.stats();
    if machine.is_halted() {
        message(MsgColor::Green, "Halted", &stats.to_string());
    } else {
        message(MsgColor::Cyan, "Stopped", &stats.to_string());
    }
    file_message(MsgColor::Green, "Completed", name);
    Ok(())
}

fn watch(name: PathBuf) -> Result<()> {
    use MsgColor::*;
    if !name.exists() {
        bail!("File does not exist. Exiting...")
    }
    // Vim breaks if watching a single file
    let folder_path = match name.parent() {
        Some(pth) if pth.is_dir() => pth.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };

    // Clear screen and move cursor to top left
    print!("\x1B[2J\x1B[2;1H");
    file_message(Green, "Watching", &name);
    message(Cyan, "Help", "press CTRL+C to exit");

    let mut watcher =
        Hotwatch::new_with_custom_delay(Duration::from_millis(500)).into_diagnostic()?;

    watcher
        .watch(folder_path, move |event: Event| match event.kind {
            // Watch remove for vim changes
            EventKind::Modify(_) | EventKind::Remove(_) => {
                print!("\x1B[2J\x1B[2;1H");
                file_message(Green, "Watching", &name);
                message(Green, "Re-checking", "file change detected");
                message(Cyan, "Help", "press CTRL+C to exit");

                sleep(Duration::from_millis(50));

                match assemble(&name) {
                    Ok((air, _)) => {
                        message(
                            Green,
                            "Success",
                            &format!("no errors found, {} instructions", air.len()),
                        );
                    }
                    Err(e) => {
                        println!("\n{:?}", e);
                    }
                };
                Flow::Continue
            }
            _ => Flow::Continue,
        })
        .into_diagnostic()?;
    watcher.run();
    Ok(())
}

/// Read and assemble a source file, attaching the file name to any diagnostic.
fn assemble(name: &Path) -> Result<(Air, SymbolTable)> {
    let contents = fs::read_to_string(name).into_diagnostic()?;
    let assembled = AsmParser::new(&contents).and_then(|parser| {
        let symbols = parser.collect_labels()?;
        Ok((parser.parse(&symbols)?, symbols))
    });
    assembled.map_err(move |report| {
        report.with_source_code(miette::NamedSource::new(name.display().to_string(), contents))
    })
}

/// Labels in definition order, formatted as listing comments.
fn symbol_listing(symbols: &SymbolTable) -> String {
    if symbols.is_empty() {
        return String::new();
    }
    let mut out = format!("\n; {} labels\n", symbols.len());
    for (name, addr) in symbols.iter() {
        out.push_str(&format!("; {name:<16} 0x{addr:02X}\n"));
    }
    out
}

const LOGO: &str = r#"
 _               _
| |__  _   _  __| |_ __ __ _ _______ _ __
| '_ \| | | |/ _` | '__/ _` |_  / _ \ '_ \
| | | | |_| | (_| | | | (_| |/ /  __/ | | |
|_| |_|\__, |\__,_|_|  \__,_/___\___|_| |_|
       |___/"#;

const SHORT_INFO: &str = r"
Welcome to hydrazen, an assembler and emulator for Hydra programs:
sixteen registers, 256 bytes of memory and a 24x24 screen.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
