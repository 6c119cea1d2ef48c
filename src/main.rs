//! `casedesk` command-line client.
//!
//! Drives the CaseDesk backend from a terminal: sign in, manage cases,
//! upload documents and chat with a case's documents. The session token is
//! kept in the user's data directory between invocations.

use anyhow::{bail, Context};
use casedesk_lib::api::{CaseStatus, CaseUpdate, RegisterRequest, UploadFile};
use casedesk_lib::commands::{cases, chat, documents};
use casedesk_lib::session::{FileSlot, LogNavigator};
use casedesk_lib::state::{AppState, Settings};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "casedesk", about = "CaseDesk legal case management client", version)]
struct Cli {
    /// Optional JSON settings file; environment variables take precedence
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// File holding the session token
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the backend is reachable.
    Health,
    /// Sign in and keep the session for later commands.
    Login {
        email: String,
        #[arg(long, env = "CASEDESK_PASSWORD")]
        password: String,
    },
    /// Create an account. Requires the registration super key.
    Register {
        email: String,
        #[arg(long, env = "CASEDESK_PASSWORD")]
        password: String,
        #[arg(long)]
        full_name: String,
        #[arg(long, env = "CASEDESK_SUPER_KEY")]
        super_key: String,
    },
    /// End the session.
    Logout,
    /// Show the signed-in user.
    Whoami,
    #[command(subcommand)]
    Cases(CaseCommand),
    #[command(subcommand)]
    Docs(DocCommand),
    #[command(subcommand)]
    Chat(ChatCommand),
}

#[derive(Subcommand)]
enum CaseCommand {
    List,
    Show { id: String },
    Create {
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<CaseStatus>,
    },
    Archive { id: String },
    Status { id: String },
}

#[derive(Subcommand)]
enum DocCommand {
    List { case_id: String },
    Upload {
        case_id: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Poll until the backend has processed the uploads
        #[arg(long)]
        wait: bool,
    },
    View { id: String },
    Delete { case_id: String, id: String },
    Chunks { id: String },
    Download {
        id: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    Status { case_id: String },
}

#[derive(Subcommand)]
enum ChatCommand {
    /// Ask a question about a case and stream the answer.
    Ask {
        case_id: String,
        query: String,
        /// Wait for the whole answer instead of streaming
        #[arg(long)]
        no_stream: bool,
    },
    History {
        case_id: String,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    Citation { chunk_id: String },
    Search {
        case_id: String,
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() {
    casedesk_lib::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        let message = match e.downcast_ref::<casedesk_lib::error::CaseDeskError>() {
            Some(err) => err.user_message(),
            None => format!("{:#}", e),
        };
        eprintln!("error: {}", message);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load(cli.settings.as_deref());
    let slot = match cli.session_file {
        Some(path) => FileSlot::new(path),
        None => FileSlot::default_location(),
    };
    let state = AppState::new(settings, Box::new(slot), Arc::new(LogNavigator))?;

    let command = match cli.command {
        Commands::Health => {
            let health = state.api.health().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
            return Ok(());
        }
        Commands::Login { email, password } => {
            let outcome = state.session.login(&email, &password).await;
            if !outcome.success {
                bail!(outcome.error.unwrap_or_else(|| "Login failed".to_string()));
            }
            println!("Logged in as {}", email);
            return Ok(());
        }
        Commands::Register {
            email,
            password,
            full_name,
            super_key,
        } => {
            let request = RegisterRequest {
                email: email.clone(),
                password,
                full_name,
                super_key,
            };
            let outcome = state.session.register(&request).await;
            if !outcome.success {
                bail!(outcome.error.unwrap_or_else(|| "Registration failed".to_string()));
            }
            println!("Registered {}", email);
            return Ok(());
        }
        other => other,
    };

    if !state.session.restore().await {
        bail!("Not logged in. Run `casedesk login <email>` first.");
    }

    match command {
        Commands::Logout => {
            state.session.logout().await;
            println!("Logged out");
        }
        Commands::Whoami => {
            let user = state.session_state().user().context("No user profile")?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Commands::Cases(cmd) => run_cases(&state, cmd).await?,
        Commands::Docs(cmd) => run_docs(&state, cmd).await?,
        Commands::Chat(cmd) => run_chat(&state, cmd).await?,
        Commands::Health | Commands::Login { .. } | Commands::Register { .. } => {}
    }
    Ok(())
}

async fn run_cases(state: &AppState, cmd: CaseCommand) -> anyhow::Result<()> {
    match cmd {
        CaseCommand::List => {
            for case in cases::load_cases(state).await? {
                println!("{}  [{}]  {}", case.id, case.status, case.title);
            }
        }
        CaseCommand::Show { id } => {
            let case = cases::open_case(state, &id).await?;
            let snapshot = state.store.snapshot();
            println!("{}", serde_json::to_string_pretty(&case)?);
            println!(
                "{} documents, {} messages",
                snapshot.documents.len(),
                snapshot.chat_messages.len()
            );
        }
        CaseCommand::Create { title, description } => {
            let case = cases::create_case(state, &title, description.as_deref()).await?;
            println!("Created case {}", case.id);
        }
        CaseCommand::Update {
            id,
            title,
            description,
            status,
        } => {
            let update = CaseUpdate {
                title,
                description,
                status,
            };
            let case = cases::update_case(state, &id, update).await?;
            println!("Updated case {}", case.id);
        }
        CaseCommand::Archive { id } => {
            cases::archive_case(state, &id).await?;
            println!("Archived case {}", id);
        }
        CaseCommand::Status { id } => {
            let status = cases::processing_status(state, &id).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }
    Ok(())
}

async fn run_docs(state: &AppState, cmd: DocCommand) -> anyhow::Result<()> {
    match cmd {
        DocCommand::List { case_id } => {
            for doc in documents::load_documents(state, &case_id).await? {
                println!(
                    "{}  {:>10} bytes  [{}]  {}",
                    doc.id, doc.file_size, doc.status, doc.filename
                );
            }
        }
        DocCommand::Upload {
            case_id,
            files,
            wait,
        } => {
            let mut staged = Vec::with_capacity(files.len());
            for path in &files {
                let file = UploadFile::from_path(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                staged.push(file);
            }

            let summary = documents::upload_documents(state, &case_id, staged).await?;
            for doc in &summary.uploaded {
                println!("uploaded  {}  {}", doc.id, doc.filename);
            }
            for failure in &summary.failed {
                println!("failed    {}: {}", failure.filename, failure.error);
            }
            documents::dismiss_upload(state);

            if wait && !summary.uploaded.is_empty() {
                let status = documents::wait_for_processing(
                    state,
                    &case_id,
                    Duration::from_secs(2),
                    150,
                )
                .await?;
                println!(
                    "processing: {} completed, {} failed, {} pending",
                    status.completed, status.failed, status.pending
                );
            }
            if summary.failed_count() > 0 {
                bail!("{} file(s) failed to upload", summary.failed_count());
            }
        }
        DocCommand::View { id } => {
            let doc = documents::preview_document(state, &id).await?;
            println!("{} ({})", doc.filename, doc.status);
            if let Some(text) = doc.raw_text {
                println!("\n{}", text);
            }
        }
        DocCommand::Delete { case_id, id } => {
            cases::open_case(state, &case_id).await?;
            documents::delete_document(state, &id).await?;
            println!("Deleted document {}", id);
        }
        DocCommand::Chunks { id } => {
            for chunk in documents::document_chunks(state, &id).await? {
                let page = chunk
                    .page_number
                    .map(|p| format!("p.{}", p))
                    .unwrap_or_default();
                println!("#{} {} {}", chunk.chunk_number, page, chunk.content);
            }
        }
        DocCommand::Download { id, output } => {
            let bytes = documents::download_document(state, &id, &output).await?;
            println!("Wrote {} bytes to {}", bytes, output.display());
        }
        DocCommand::Status { case_id } => {
            let status = documents::refresh_processing_status(state, &case_id).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }
    Ok(())
}

async fn run_chat(state: &AppState, cmd: ChatCommand) -> anyhow::Result<()> {
    match cmd {
        ChatCommand::Ask {
            case_id,
            query,
            no_stream,
        } => {
            cases::open_case(state, &case_id).await?;
            let message = if no_stream {
                let message = chat::ask(state, &query).await?;
                println!("{}", message.content);
                message
            } else {
                let mut stdout = std::io::stdout();
                let message = chat::send_message(state, &query, |piece| {
                    let _ = stdout.write_all(piece.as_bytes());
                    let _ = stdout.flush();
                })
                .await?;
                println!();
                message
            };

            if !message.citations.is_empty() {
                println!("\nSources:");
                for (i, citation) in message.citations.iter().enumerate() {
                    let page = citation
                        .page_number
                        .map(|p| format!(", p.{}", p))
                        .unwrap_or_default();
                    println!(
                        "  [{}] {}{} ({:.0}%)",
                        i + 1,
                        citation.document_name,
                        page,
                        citation.relevance_score * 100.0
                    );
                }
            }
        }
        ChatCommand::History { case_id, limit } => {
            for message in chat::load_history(state, &case_id, limit).await? {
                println!("{:?}: {}", message.role, message.content);
            }
        }
        ChatCommand::Citation { chunk_id } => {
            let citation = chat::open_citation(state, &chunk_id).await?;
            println!("{}", serde_json::to_string_pretty(&citation)?);
        }
        ChatCommand::Search {
            case_id,
            query,
            limit,
        } => {
            for result in chat::search(state, &case_id, &query, limit).await? {
                println!(
                    "{:.2}  {}  {}",
                    result.relevance_score, result.document_name, result.content_preview
                );
            }
        }
    }
    Ok(())
}
