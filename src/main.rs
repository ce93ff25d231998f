use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use davisbase::executor;
use davisbase::planner::{self, Command};
use davisbase::storage::database::Database;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "davisbase", about = "A small file-backed SQL database engine")]
struct Args {
    /// Directory holding the database's .tbl files
    #[arg(default_value = ".")]
    directory: PathBuf,

    /// Page length in bytes for newly created tables
    #[arg(long, default_value_t = 512)]
    page_length: u16,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    // A broken bootstrap leaves no engine to run commands against.
    let mut database = match Database::open(&args.directory, args.page_length) {
        Ok(database) => database,
        Err(err) => {
            eprintln!("[ERROR] {}", err);
            return ExitCode::FAILURE;
        }
    };
    info!(directory = %args.directory.display(), "database ready");

    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("[ERROR] {}", err);
            return ExitCode::FAILURE;
        }
    };

    loop {
        match editor.readline("davisbase> ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(input);
                let bare = input.trim_end_matches(';').trim();
                if bare.eq_ignore_ascii_case("exit") || bare.eq_ignore_ascii_case("quit") {
                    return ExitCode::SUCCESS;
                }
                match planner::parse_statements(input) {
                    Ok(commands) => {
                        for command in commands {
                            if command == Command::Exit {
                                return ExitCode::SUCCESS;
                            }
                            let mut stdout = io::stdout();
                            if let Err(err) = executor::execute(&mut database, command, &mut stdout)
                            {
                                eprintln!("[ERROR] {}", err);
                            }
                        }
                    }
                    Err(err) => eprintln!("[ERROR] {}", err),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("[ERROR] {}", err);
                break;
            }
        }
    }

    ExitCode::SUCCESS
}
