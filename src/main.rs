use std::fs;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use hotwatch::notify::Event;
use hotwatch::{
    blocking::{Flow, Hotwatch},
    EventKind,
};
use miette::{bail, IntoDiagnostic, Result};

use jns::env::Env;
use jns::output::{self, Listing};
use jns::MemoryImage;

/// Extension of JohnnyScript sources.
const SOURCE_EXTENSION: &str = "jns";
/// Extension of assembled memory images.
const OUTPUT_EXTENSION: &str = "ram";

/// jns assembles JohnnyScript into `.ram` memory images for the Johnny simulator.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.jns` file to compile
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.ram` file from a `.jns` file
    Compile {
        /// `.jns` file to compile
        name: PathBuf,
        /// Destination of the `.ram` file, defaults to the current directory
        dest: Option<PathBuf>,
    },
    /// Check a `.jns` file without writing a `.ram` file
    Check {
        /// File to check
        name: PathBuf,
    },
    /// Place a watch on a `.jns` file to receive constant assembler updates
    Watch {
        /// `.jns` file to watch
        name: PathBuf,
    },
}

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    let env = Env::from_vars();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(jns::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    match args.command {
        Some(Command::Compile { name, dest }) => compile(&name, dest, env),
        Some(Command::Check { name }) => {
            file_message(Green, "Checking", &name);
            let _ = assemble(&name)?;
            message(Green, "Success", "no errors found!");
            Ok(())
        }
        Some(Command::Watch { name }) => watch(name),
        None => match args.path {
            Some(path) => compile(&path, None, env),
            None => {
                eprintln!("{SHORT_INFO}");
                bail!("No input file given. Usage: jns <file.{SOURCE_EXTENSION}>")
            }
        },
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

fn message<S>(color: MsgColor, left: S, right: S)
where
    S: Colorize + std::fmt::Display,
{
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

/// Assemble `name` and write the image next to the current directory. Nothing is written if
/// assembly fails.
fn compile(name: &Path, dest: Option<PathBuf>, env: Env) -> Result<()> {
    file_message(MsgColor::Green, "Assembling", name);
    let image = assemble(name)?;
    message(MsgColor::Green, "Finished", "emit memory image");

    let out_file_name = match dest {
        Some(dest) => dest,
        None => match name.with_extension(OUTPUT_EXTENSION).file_name() {
            Some(file_name) => PathBuf::from(file_name),
            None => bail!("Cannot derive an output name from {}", name.display()),
        },
    };
    output::write_ram(&out_file_name, &image).into_diagnostic()?;

    if env.listing {
        print!("{}", Listing(&image));
    }
    file_message(MsgColor::Green, "Saved", &out_file_name);
    Ok(())
}

/// Read and assemble a source file, refusing anything that is not a `.jns` file.
fn assemble(name: &Path) -> Result<MemoryImage> {
    match name.extension().and_then(|ext| ext.to_str()) {
        Some(SOURCE_EXTENSION) => {}
        Some(_) => bail!("File has unknown extension. Exiting..."),
        None => bail!("File has no extension. Exiting..."),
    }
    let contents = match fs::read_to_string(name) {
        Ok(contents) => contents,
        Err(e) => bail!("Invalid filename {}: {e}", name.display()),
    };
    jns::assemble(&contents)
}

fn watch(name: PathBuf) -> Result<()> {
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
    file_message(MsgColor::Green, "Watching", &name);
    message(MsgColor::Cyan, "Help", "press CTRL+C to exit");

    let mut watcher =
        Hotwatch::new_with_custom_delay(Duration::from_millis(500)).into_diagnostic()?;

    watcher
        .watch(folder_path, move |event: Event| match event.kind {
            // Watch remove for vim changes
            EventKind::Modify(_) | EventKind::Remove(_) => {
                print!("\x1B[2J\x1B[2;1H");
                file_message(MsgColor::Green, "Watching", &name);
                message(MsgColor::Green, "Re-checking", "file change detected");
                message(MsgColor::Cyan, "Help", "press CTRL+C to exit");

                // Makes reruns more obvious
                sleep(Duration::from_millis(50));

                match assemble(&name) {
                    Ok(_) => message(MsgColor::Green, "Success", "no errors found!"),
                    Err(e) => println!("\n{:?}", e),
                }
                Flow::Continue
            }
            _ => Flow::Continue,
        })
        .into_diagnostic()?;
    watcher.run();
    Ok(())
}

const SHORT_INFO: &str = r"
jns assembles JohnnyScript (.jns) into memory images (.ram) for the Johnny simulator.
Please use `-h` or `--help` to access the usage instructions.
";
