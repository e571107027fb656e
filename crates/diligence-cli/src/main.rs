//! Due diligence report CLI
//!
//! # Usage
//!
//! ```bash
//! # Agent platform and web search connection
//! export AGENTS_ENDPOINT="https://<resource>.services.ai.azure.com/api/projects/<project>"
//! export AGENTS_API_KEY="..."
//! export BING_CONNECTION_NAME="bing-search"
//!
//! # Interactive console
//! diligence
//!
//! # One-shot report with the comprehensive pass and a question
//! diligence generate --company Microsoft --start 2024-06-01 --end 2024-06-10 \
//!     --comprehensive --ask "Did it pass due diligence?"
//! ```

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use diligence_platform::AgentsClient;
use diligence_report::{
    Command, ConsoleConfig, DiligenceConfig, DiligenceConsole, DueDiligence, Reply,
    YahooMarketData,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "diligence")]
#[command(about = "Due diligence reports from market data and an analysis agent", long_about = None)]
struct Args {
    /// Directory for CSV exports and documents
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Directory for chart images (defaults to the output directory)
    #[arg(long, global = true)]
    charts_dir: Option<PathBuf>,

    /// Deployed model name
    #[arg(long, global = true)]
    model: Option<String>,

    /// Web search connection bound to report agents
    #[arg(long, global = true)]
    bing_connection: Option<String>,

    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Interactive console (default)
    Repl,
    /// Generate one report and exit
    Generate {
        /// Company name or ticker
        #[arg(long)]
        company: String,

        /// First day of the range (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day of the range, inclusive (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Also run the comprehensive due diligence
        #[arg(long)]
        comprehensive: bool,

        /// Question about the finished report; may be repeated
        #[arg(long = "ask")]
        questions: Vec<String>,
    },
}

fn diligence_config(args: &Args) -> anyhow::Result<DiligenceConfig> {
    let mut builder = DiligenceConfig::builder();
    if let Some(dir) = &args.output_dir {
        builder = builder.output_dir(dir);
    }
    if let Some(dir) = &args.charts_dir {
        builder = builder.charts_dir(dir);
    }
    if let Some(model) = &args.model {
        builder = builder.model(model);
    }
    if let Some(name) = &args.bing_connection {
        builder = builder.bing_connection_name(name);
    }

    Ok(builder.with_env().build()?)
}

fn print_reply(reply: &Reply) {
    if let Reply::Text(text) = reply {
        println!("{text}\n");
    }
}

async fn run_once(
    console: &mut DiligenceConsole,
    company: String,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    comprehensive: bool,
    questions: Vec<String>,
) -> anyhow::Result<()> {
    let mut commands = vec![Command::Generate {
        company,
        start,
        end,
    }];
    if comprehensive {
        commands.push(Command::Comprehensive);
    }
    commands.extend(
        questions
            .into_iter()
            .map(|question| Command::Ask { question }),
    );

    for command in commands {
        info!("Running: {}", command.description());
        print_reply(&console.execute(command).await?);
    }

    Ok(())
}

async fn run_repl(console: &mut DiligenceConsole) -> anyhow::Result<()> {
    println!("{}\n", console.welcome());

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{}", console.prompt());
        stdout.flush()?;

        let mut input = String::new();
        match stdin.lock().read_line(&mut input) {
            Ok(0) => {
                // EOF
                println!("\nGoodbye!");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {e}");
                continue;
            }
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match console.process_input(input).await {
            Ok(Reply::Exit) => {
                println!("Goodbye!");
                break;
            }
            Ok(reply) => print_reply(&reply),
            Err(e) => eprintln!("Error: {e}\n"),
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    diligence_utils::init_tracing();

    let args = Args::parse();
    let config = diligence_config(&args)?;
    info!(
        "Writing reports to {} with model {}",
        config.output_dir.display(),
        config.model
    );

    let platform = Arc::new(AgentsClient::from_env()?);
    let service = DueDiligence::new(platform, Arc::new(YahooMarketData::new()), config)?;
    let mut console = DiligenceConsole::new(service, ConsoleConfig::default());

    match args.command {
        Some(Mode::Generate {
            company,
            start,
            end,
            comprehensive,
            questions,
        }) => run_once(&mut console, company, start, end, comprehensive, questions).await,
        Some(Mode::Repl) | None => run_repl(&mut console).await,
    }
}
