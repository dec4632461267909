use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{Notify, mpsc};
use tracing_subscriber::EnvFilter;

use carevoice::assistant::console::{ConsoleBackend, ConsoleSynthesizer};
use carevoice::assistant::{self, AssistantEvent, AssistantSession, Command as SessionCommand};
use carevoice::voice::{RecognitionEvent, Role, Utterance};
use carevoice::{CommandMatcher, Config, simplify};

/// Carevoice - voice command interpreter for caregiver booking
#[derive(Parser)]
#[command(name = "carevoice", version, about)]
struct Cli {
    /// Command catalog to use instead of the built-in one
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Recognition language (e.g. "en-US")
    #[arg(long, global = true)]
    language: Option<String>,

    /// Speech output voice
    #[arg(long, global = true)]
    voice: Option<String>,

    /// Don't speak responses
    #[arg(long, global = true)]
    no_speak: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Classify an utterance and print the result as JSON
    Match {
        /// Utterance to classify
        #[arg(required = true, num_args = 1..)]
        utterance: Vec<String>,
        /// Route the utterance is spoken on
        #[arg(short, long, default_value = "/")]
        route: String,
    },
    /// Collapse repeated words and phrases
    Simplify {
        /// Transcript to simplify
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// List catalog entries and keyword rules
    Catalog,
    /// Interactive session; typed lines stand in for speech
    Repl {
        /// Starting route
        #[arg(short, long)]
        route: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn,carevoice=info",
        1 => "info,carevoice=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(path) = cli.catalog {
        config.catalog_path = Some(path);
    }
    if let Some(language) = cli.language {
        config.recognition.language = language;
    }
    if let Some(voice) = cli.voice {
        config.speech.voice = Some(voice);
    }
    if cli.no_speak {
        config.speech.auto_speak = false;
    }
    config.validate()?;

    let matcher = CommandMatcher::new(Arc::new(config.commands()?));

    match cli.command.unwrap_or(Command::Repl { route: None }) {
        Command::Match { utterance, route } => {
            let result = matcher.match_command(&utterance.join(" "), &route);
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Command::Simplify { text } => {
            println!("{}", simplify(&text.join(" ")));
            Ok(())
        }
        Command::Catalog => {
            print_catalog(&matcher);
            Ok(())
        }
        Command::Repl { route } => {
            if let Some(route) = route {
                config.assistant.initial_route = route;
                config.validate()?;
            }
            repl(matcher, config).await
        }
    }
}

fn print_catalog(matcher: &CommandMatcher) {
    let commands = matcher.commands();

    for catalog in [commands.navigation(), commands.services(), commands.control()] {
        println!("[{}]", catalog.kind());
        for entry in catalog.entries() {
            if entry.closes_assistant {
                println!("  {:<28} (closes assistant)", entry.phrase);
            } else if entry.stops_speaking {
                println!("  {:<28} (stops speech)", entry.phrase);
            } else if entry.target_route.is_empty() {
                println!("  {:<28} (speak only)", entry.phrase);
            } else {
                println!("  {:<28} -> {}", entry.phrase, entry.target_route);
            }
        }
        println!();
    }

    println!("[keyword rules]");
    for rule in commands.keyword_rules().rules() {
        println!(
            "  /{}/ -> {} \"{}\"",
            rule.pattern(),
            rule.table(),
            rule.entry().phrase
        );
    }
    println!();

    println!("[pages]");
    for route in commands.pages().routes() {
        println!("  {route:<16} {}", commands.pages().get(route).name);
    }
}

async fn repl(matcher: CommandMatcher, config: Config) -> anyhow::Result<()> {
    let (command_tx, command_rx) = mpsc::channel(64);
    let (event_tx, mut event_rx) = mpsc::channel(64);

    let backend = ConsoleBackend::new(command_tx.clone());
    let session = AssistantSession::new(
        matcher,
        Box::new(backend),
        Box::new(ConsoleSynthesizer::default()),
        &config,
    )?;
    let runtime = tokio::spawn(assistant::run(session, command_rx, event_tx));

    let listening = Arc::new(AtomicBool::new(false));
    let closed = Arc::new(Notify::new());

    let printer = {
        let listening = Arc::clone(&listening);
        let closed = Arc::clone(&closed);
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                print_event(&event);
                match event {
                    AssistantEvent::Listening { active } => listening.store(active, Ordering::SeqCst),
                    AssistantEvent::Close => closed.notify_one(),
                    _ => {}
                }
            }
        })
    };

    println!("carevoice: type to talk, :help for commands");
    if config.assistant.auto_listen {
        command_tx.send(SessionCommand::StartListening).await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            () = closed.notified() => break,
        };
        let Some(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command = match line {
            ":quit" | ":q" => break,
            ":start" => SessionCommand::StartListening,
            ":stop" => SessionCommand::StopListening,
            ":toggle" => SessionCommand::ToggleListening,
            ":help" => {
                println!(":route <path>  :start  :stop  :toggle  :quit");
                continue;
            }
            _ => {
                if let Some(route) = line.strip_prefix(":route") {
                    SessionCommand::SetRoute(route.trim().to_string())
                } else if listening.load(Ordering::SeqCst) {
                    SessionCommand::Recognition(RecognitionEvent::Result(vec![
                        Utterance::final_text(line),
                    ]))
                } else {
                    SessionCommand::Text(line.to_string())
                }
            }
        };
        command_tx.send(command).await?;
    }

    command_tx.send(SessionCommand::Shutdown).await?;
    drop(command_tx);
    let session = runtime.await?;
    drop(session);
    printer.await?;
    Ok(())
}

fn print_event(event: &AssistantEvent) {
    match event {
        AssistantEvent::Navigate { route } => println!("-> navigate {route}"),
        AssistantEvent::Message(message) => match message.role {
            Role::User => println!("you: {}", message.content),
            Role::Assistant => println!("assistant: {}", message.content),
        },
        AssistantEvent::Close => println!("-- assistant closed"),
        AssistantEvent::Interim { text } => println!("... {text}"),
        AssistantEvent::Listening { active: true } => println!("-- listening"),
        AssistantEvent::Listening { active: false } => println!("-- not listening"),
        AssistantEvent::LanguageChanged { language } => println!("-- language: {language}"),
        AssistantEvent::Notice(notice) => println!("!! {notice}"),
    }
}
