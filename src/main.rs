use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password};
use futures_util::StreamExt;
use tracing::info;

use docchat_core::{
    decode_stream, ApiClient, ChatRole, ChatSession, Config, KnowledgeBase, NoHistory, PdfSession,
    Source, StreamRecord,
};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::{App, ChatKind};

#[derive(Parser)]
#[command(name = "docchat", version)]
#[command(about = "Chat with a RAG knowledge base from the terminal")]
struct Cli {
    /// Backend URL (overrides config and DOCCHAT_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the access token
    Login {
        email: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account
    Register {
        email: String,
        /// Create an admin account (asks for the admin key)
        #[arg(long)]
        admin: bool,
    },
    /// Forget the stored access token
    Logout,
    /// Show the logged-in account
    Whoami,
    /// Manage knowledge-base documents (admin only)
    Docs {
        #[command(subcommand)]
        command: DocsCommand,
    },
    /// Ask a single question and print the answer
    Ask {
        question: String,
        /// Number of passages to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<u32>,
        /// Wait for the full answer instead of streaming it
        #[arg(long)]
        no_stream: bool,
    },
    /// Open the chat screen for the knowledge base
    Chat,
    /// Upload a PDF and chat with it, no account needed
    Pdf { file: PathBuf },
    /// Print the stored conversation
    History,
    /// Delete the stored conversation
    ClearHistory {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum DocsCommand {
    /// List uploaded documents
    List,
    /// Upload a PDF into the knowledge base
    Upload {
        file: PathBuf,
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Delete a document by id
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }

    // The chat screen owns the terminal, so its logs go to a file
    if matches!(cli.command, Commands::Chat | Commands::Pdf { .. }) {
        let log_path = logging::init_file()?;
        info!(path = %log_path.display(), api_url = %config.api_url, "Starting chat");
    } else {
        logging::init_stderr();
    }

    run_command(&config, cli.command).await
}

fn client(config: &Config) -> ApiClient {
    ApiClient::new(&config.api_url).with_token(config.token.clone())
}

/// A client carrying the stored token, or an error asking the user to log in.
fn authed_client(config: &Config) -> Result<ApiClient> {
    if config.token.is_none() {
        bail!("Not logged in. Run: docchat login <email>");
    }
    Ok(client(config))
}

async fn run_command(config: &Config, command: Commands) -> Result<()> {
    match command {
        Commands::Login { email, password } => login(config, &email, password).await,
        Commands::Register { email, admin } => register(config, &email, admin).await,
        Commands::Logout => {
            Config::save_token(None)?;
            println!("{}", "Logged out".green());
            Ok(())
        }
        Commands::Whoami => {
            let user = authed_client(config)?.me().await?;
            println!("{} ({})", user.email.bold(), user.role.as_str().cyan());
            Ok(())
        }
        Commands::Docs { command } => docs(config, command).await,
        Commands::Ask { question, top_k, no_stream } => {
            let api = authed_client(config)?;
            ask(&api, &question, top_k.unwrap_or(config.top_k), no_stream).await
        }
        Commands::History => history(config).await,
        Commands::ClearHistory { yes } => {
            let api = authed_client(config)?;
            if !yes && !confirm("Delete your whole conversation history?")? {
                return Ok(());
            }
            api.clear_conversations().await?;
            println!("{}", "Conversation history cleared".green());
            Ok(())
        }
        Commands::Chat => run_chat(config).await,
        Commands::Pdf { file } => run_pdf_chat(config, &file).await,
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

fn prompt_password(prompt: &str) -> Result<String> {
    Ok(Password::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact()?)
}

async fn login(config: &Config, email: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => prompt_password("Password")?,
    };

    let mut api = ApiClient::new(&config.api_url);
    let user = api.login(email, &password).await?;
    Config::save_token(api.token())?;

    println!("Logged in as {} ({})", user.email.bold(), user.role.as_str().cyan());
    Ok(())
}

async fn register(config: &Config, email: &str, admin: bool) -> Result<()> {
    let password = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Password")
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()?;

    let api = ApiClient::new(&config.api_url);
    let user = if admin {
        let admin_key: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Admin key")
            .interact_text()?;
        api.register_admin(email, &password, &admin_key).await?
    } else {
        api.register(email, &password).await?
    };

    println!(
        "Registered {} as {}. Log in with: {}",
        user.email.bold(),
        user.role.as_str().cyan(),
        format!("docchat login {}", user.email).bold()
    );
    Ok(())
}

async fn docs(config: &Config, command: DocsCommand) -> Result<()> {
    let api = authed_client(config)?;

    match command {
        DocsCommand::List => {
            let documents = api.list_documents().await?;
            println!("\n{}", "Knowledge Base Documents".bold().blue());
            println!("{}", "=".repeat(40).dimmed());

            if documents.is_empty() {
                println!("{}", "No documents uploaded yet".yellow());
                return Ok(());
            }
            for doc in &documents {
                println!(
                    "  • {}  {}  {}",
                    doc.title.as_deref().unwrap_or("Untitled").green(),
                    doc.id.dimmed(),
                    doc.created_at.dimmed()
                );
            }
            println!("\n{} documents", documents.len().to_string().bold());
        }
        DocsCommand::Upload { file, title } => {
            println!("Uploading {}...", file.display().to_string().cyan());
            let ingested = api.upload_document(&file, title.as_deref()).await?;
            println!(
                "{} {} ({})",
                "Ingested".green(),
                ingested.title.as_deref().unwrap_or("document").bold(),
                ingested.doc_id.dimmed()
            );
        }
        DocsCommand::Delete { id, yes } => {
            if !yes && !confirm(&format!("Delete document {}?", id))? {
                return Ok(());
            }
            api.delete_document(&id).await?;
            println!("{} {}", "Deleted".green(), id);
        }
    }
    Ok(())
}

async fn ask(api: &ApiClient, question: &str, top_k: u32, no_stream: bool) -> Result<()> {
    if question.trim().is_empty() {
        bail!("Question is empty");
    }

    if no_stream {
        let response = api.query(question, top_k).await?;
        println!("{}", response.answer);
        print_sources(&response.sources);
        return Ok(());
    }

    let body = api.query_stream(question, top_k).await?;
    let mut records = std::pin::pin!(decode_stream(body));
    let mut stdout = std::io::stdout();
    let mut sources = None;

    while let Some(value) = records.next().await {
        for record in StreamRecord::from_value(value?) {
            match record {
                StreamRecord::Chunk(text) => {
                    write!(stdout, "{}", text)?;
                    stdout.flush()?;
                }
                StreamRecord::Complete { sources: cited } => sources = Some(cited),
            }
        }
    }
    println!();

    if let Some(sources) = sources {
        print_sources(&sources);
    }
    Ok(())
}

fn print_sources(sources: &[Source]) {
    if sources.is_empty() {
        return;
    }
    println!("\n{}", "Sources:".bold().blue());
    for (i, source) in sources.iter().enumerate() {
        let preview: String = source.chunk.split_whitespace().collect::<Vec<_>>().join(" ");
        let preview: String = preview.chars().take(100).collect();
        println!(
            "{}. {} {}",
            (i + 1).to_string().bold(),
            source.doc_id.as_deref().unwrap_or("document").yellow(),
            format!("({:.3})", source.score).dimmed()
        );
        println!("   {}", preview.dimmed());
    }
}

async fn history(config: &Config) -> Result<()> {
    let messages = authed_client(config)?.conversation_history().await?;
    if messages.is_empty() {
        println!("{}", "No conversation yet".yellow());
        return Ok(());
    }
    for message in messages {
        let label = match message.role {
            ChatRole::User => "You:".bold().cyan(),
            ChatRole::Assistant => "AI:".bold().yellow(),
        };
        println!("{}\n{}\n", label, message.content);
    }
    Ok(())
}

async fn run_chat(config: &Config) -> Result<()> {
    let api = authed_client(config)?;
    let user = api
        .me()
        .await
        .map_err(|e| anyhow!("Could not verify login ({}). Run: docchat login <email>", e))?;

    let backend = Arc::new(KnowledgeBase::new(api.clone(), config.top_k));
    let session = ChatSession::restore(backend, Arc::new(api)).await;

    run_tui(ChatKind::KnowledgeBase { user }, session).await
}

async fn run_pdf_chat(config: &Config, file: &Path) -> Result<()> {
    println!("Uploading and processing {}...", file.display().to_string().cyan());
    let api = client(config);
    let info = api
        .upload_pdf_session(file)
        .await
        .map_err(|e| anyhow!("Failed to upload PDF: {}", e))?;
    info!(session = %info.id, filename = %info.filename, "PDF session created");

    let filename = info.filename.clone();
    let backend = Arc::new(PdfSession::new(api, info, config.session_top_k));
    let session = ChatSession::new(backend, Arc::new(NoHistory));

    run_tui(ChatKind::Pdf { filename }, session).await
}

async fn run_tui(kind: ChatKind, session: ChatSession) -> Result<()> {
    let mut events = tui::EventHandler::new();
    let mut app = App::new(kind, session, events.sender());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event).await?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}
