//! suvctl - command-line interface for the SUV academic portal

mod cli;
mod config;
mod error;
mod logging;
mod output;
mod session_file;

use clap::Parser;
use cli::{Args, Command, SearchTarget};
use config::Config;
use error::CliError;
use output::OutputFormatter;
use session_file::SessionFile;
use suv_http_client::{StudentQuery, SuvClient};

fn main() {
    let args = Args::parse();
    logging::init_logging(args.detailed);

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let config = Config::from_args(&args)?;
    let session_file = SessionFile::new(config.session_file.clone());
    let formatter = OutputFormatter::new(config.json);
    let client = config.client()?;

    match args.command {
        Command::Login { user } => {
            let user_code = config::resolve_user_code(user)?;
            let password = config::resolve_password()?;
            let token = client.login(&user_code, &password)?;
            session_file.save(&token)?;
            println!("Logged in as {}.", user_code);
        }
        Command::Logout => {
            restore_saved_session(&client, &config, &session_file)?;
            client.logout()?;
            session_file.clear()?;
            println!("Logged out.");
        }
        Command::Status => {
            let saved = config.env_session.is_some() || session_file.load()?.is_some();
            formatter.print_status(&config.host, saved)?;
        }
        Command::Grades => {
            restore_saved_session(&client, &config, &session_file)?;
            formatter.print_grades(&client.grades()?)?;
        }
        Command::Search { target } => {
            restore_saved_session(&client, &config, &session_file)?;
            match target {
                SearchTarget::Student {
                    code,
                    name,
                    lastname,
                    dni,
                } => {
                    let query = StudentQuery::from_criteria(&code, &name, &lastname, &dni)
                        .ok_or_else(|| {
                            CliError::Config(
                                "Give --code, --name with --lastname, or --dni".to_string(),
                            )
                        })?;
                    formatter.print_students(&client.search_student(&query)?)?;
                }
                SearchTarget::Professor { name, lastname } => {
                    formatter.print_professors(&client.search_professor(&name, &lastname)?)?;
                }
            }
        }
    }

    Ok(())
}

/// Load the token from SUV_SESSION or the session file into the client
///
/// Without a saved token the client stays unauthenticated and the command
/// fails locally with a "not authenticated" error.
fn restore_saved_session(
    client: &SuvClient,
    config: &Config,
    session_file: &SessionFile,
) -> Result<(), CliError> {
    let token = match &config.env_session {
        Some(token) => Some(token.clone()),
        None => session_file.load()?,
    };
    match token {
        Some(token) => client.restore_session(&token)?,
        None => tracing::debug!(path = %session_file.path().display(), "no saved session"),
    }
    Ok(())
}
