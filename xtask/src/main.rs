//! Build automation tasks for the desk-kit project.
//!
//! Run with: `cargo xtask <command>`

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::process::{Command, ExitCode};

/// Firmware demos under `demos/`.
const DEMOS: [&str; 2] = ["desk", "height_log"];

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation for desk-kit project", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks: firmware builds for both boards, demos, host tests
    CheckAll,
    /// Run the host unit and integration tests
    Test,
    /// Build the library for a board
    Build {
        #[arg(long, default_value = "pico1")]
        board: Board,
    },
    /// Build a demo
    Demo {
        /// Demo name (desk or height_log)
        name: String,
        #[arg(long, default_value = "pico1")]
        board: Board,
    },
    /// Build UF2 firmware file for flashing to Pico
    Uf2 {
        /// Demo name (desk or height_log)
        name: String,
        #[arg(long, default_value = "pico1")]
        board: Board,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Board {
    Pico1,
    Pico2,
}

impl Board {
    /// Cargo feature that selects this board.
    fn feature(self) -> &'static str {
        match self {
            Board::Pico1 => "pico1",
            Board::Pico2 => "pico2",
        }
    }

    fn target(self) -> &'static str {
        match self {
            Board::Pico1 => "thumbv6m-none-eabi",
            Board::Pico2 => "thumbv8m.main-none-eabihf",
        }
    }

    fn features(self) -> String {
        format!("{},arm,defmt", self.feature())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckAll => check_all(),
        Commands::Test => {
            if run_host_tests() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Commands::Build { board } => build_lib(board),
        Commands::Demo { name, board } => build_demo(&name, board),
        Commands::Uf2 { name, board } => build_uf2(&name, board),
    }
}

fn check_all() -> ExitCode {
    for board in [Board::Pico1, Board::Pico2] {
        println!("{}", format!("==> Building library ({})...", board.feature()).cyan());
        if !cargo_firmware(&["build", "--lib"], board) {
            return ExitCode::FAILURE;
        }

        println!("\n{}", format!("==> Building demos ({})...", board.feature()).cyan());
        for demo in DEMOS {
            println!("  {}", format!("- {demo}").bright_black());
            if !cargo_firmware(&["build", "--example", demo], board) {
                return ExitCode::FAILURE;
            }
        }
        println!();
    }

    if !run_host_tests() {
        return ExitCode::FAILURE;
    }

    println!("\n{}", "==> Building documentation...".cyan());
    if !cargo_firmware(&["doc", "--no-deps"], Board::Pico1) {
        return ExitCode::FAILURE;
    }

    println!("\n{}", "==> All checks passed!".green().bold());
    ExitCode::SUCCESS
}

fn run_host_tests() -> bool {
    println!("{}", "==> Running host tests...".cyan());
    let mut test_cmd = Command::new("cargo");
    test_cmd
        .current_dir(workspace_root())
        .args(["test", "--package", "desk-kit", "--lib", "--tests"]);

    match host_target() {
        Some(target) => {
            println!(
                "  {}",
                format!("Using host target: {target}").bright_black()
            );
            test_cmd.arg("--target").arg(target);
        }
        None => {
            println!(
                "{}",
                "  Unable to detect host target; relying on cargo default.".bright_black()
            );
        }
    }

    run_command(&mut test_cmd)
}

fn build_lib(board: Board) -> ExitCode {
    println!(
        "{}",
        format!("Building library with features: {}", board.features()).cyan()
    );

    if cargo_firmware(&["build", "--lib"], board) {
        println!("{}", "Build successful!".green());
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn build_demo(name: &str, board: Board) -> ExitCode {
    if !DEMOS.contains(&name) {
        eprintln!(
            "{}",
            format!("Unknown demo '{name}'; expected one of {DEMOS:?}").red()
        );
        return ExitCode::FAILURE;
    }
    println!(
        "{}",
        format!("Building demo '{name}' with features: {}", board.features()).cyan()
    );

    if cargo_firmware(&["build", "--example", name], board) {
        println!("{}", "Build successful!".green());
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn build_uf2(name: &str, board: Board) -> ExitCode {
    let target = board.target();

    println!("{}", format!("Building UF2 for demo '{name}' ({})", board.feature()).cyan());
    println!("  Features: {}", board.features().bright_black());
    println!("  Target: {}", target.bright_black());

    // Build in release mode for UF2
    if !cargo_firmware(&["build", "--example", name, "--release"], board) {
        return ExitCode::FAILURE;
    }

    // Convert to UF2 using elf2uf2-rs
    let elf_path = format!("target/{target}/release/examples/{name}");
    let uf2_path = format!("{name}.uf2");

    println!("\n{}", "Converting to UF2 format...".cyan());

    if run_command(
        Command::new("elf2uf2-rs")
            .current_dir(workspace_root())
            .args([&elf_path, &uf2_path]),
    ) {
        println!("{}", format!("UF2 created: {uf2_path}").green().bold());
        println!("{}", "Ready to drag-and-drop to your Pico!".bright_black());
        ExitCode::SUCCESS
    } else {
        println!(
            "{}",
            "Note: Install elf2uf2-rs with: cargo install elf2uf2-rs".yellow()
        );
        ExitCode::FAILURE
    }
}

/// Run a cargo command for `board`'s firmware target and features.
fn cargo_firmware(args: &[&str], board: Board) -> bool {
    run_command(
        Command::new("cargo")
            .current_dir(workspace_root())
            .args(args)
            .args(["--target", board.target()])
            .args(["--features", &board.features(), "--no-default-features"]),
    )
}

fn workspace_root() -> std::path::PathBuf {
    // `cargo xtask` runs from the workspace root.
    std::env::current_dir().expect("Failed to get current directory")
}

/// The host triple from `rustc -vV`, so host tests ignore any firmware target
/// set in the environment.
fn host_target() -> Option<String> {
    let output = Command::new("rustc").arg("-vV").output().ok()?;
    output.status.success().then_some(())?;
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .find_map(|line| line.strip_prefix("host: "))
        .map(|host| host.trim().to_owned())
}

fn run_command(cmd: &mut Command) -> bool {
    let program = cmd.get_program().to_string_lossy().into_owned();
    match cmd.status() {
        Ok(status) if status.success() => true,
        Ok(status) => {
            eprintln!("{}", format!("{program} exited with {status}").red());
            false
        }
        Err(err) => {
            eprintln!("{}", format!("Failed to run {program}: {err}").red());
            false
        }
    }
}
