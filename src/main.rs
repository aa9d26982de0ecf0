use std::future::Future;
use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use docent_core::agent::StreamUpdate;
use docent_core::config::Config;
use docent_core::context::{self, AppContext};
use docent_core::logs::{LogSource, LogStore};
use docent_core::session::ChatSession;
use docent_eval::{Judge, QuestionGenerator, Report};
use docent_index::Index;
use docent_llm::provider::LlmProvider;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

const STOP_WORDS: [&str; 3] = ["stop", "quit", "exit"];

/// Documentation assistant: retrieval-augmented answers over a local docs
/// snapshot, with interaction logs and checklist-based evaluation.
#[derive(Parser)]
#[command(name = "docent", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    ///
    /// Falls back to `DOCENT_CONFIG`, then `config/default.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive question loop. Type `stop` to end.
    Chat,

    /// Answer a single question and exit.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Load and index the corpus, then print statistics.
    Index {
        /// Run a search against the built index and print the hits.
        #[arg(long)]
        query: Option<String>,
    },

    /// Judge every stored interaction log and print pass rates.
    Eval {
        /// Log directory to read instead of the configured one.
        #[arg(long)]
        logs: Option<PathBuf>,
    },

    /// Generate questions from sampled documents and log the agent's answers.
    Generate {
        /// Number of documents to sample.
        #[arg(long)]
        samples: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config);
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    config.validate()?;
    tracing::debug!(path = %config_path.display(), "config loaded");

    match cli.command {
        Commands::Chat => run_chat(config).await,
        Commands::Ask { question } => run_ask(config, &question).await,
        Commands::Index { query } => run_index(&config, query.as_deref()),
        Commands::Eval { logs } => run_eval(config, logs).await,
        Commands::Generate { samples } => run_generate(config, samples).await,
    }
}

/// Tracing goes to stderr so streamed answers own stdout.
fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn resolve_config_path(cli: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli {
        return path;
    }
    if let Ok(path) = std::env::var("DOCENT_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

async fn run_chat(config: Config) -> anyhow::Result<()> {
    let ctx = AppContext::from_config(config)?;
    let mut session = ChatSession::new(&ctx);
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    println!("Ask a question about the documentation. Type 'stop' to exit.");
    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;

        let Some(question) = next_question(&mut lines, interrupted()).await? else {
            println!("\nGoodbye!");
            break;
        };

        println!();
        tokio::select! {
            result = session.ask(&question, print_update) => match result {
                Ok(reply) => {
                    println!();
                    if let Err(e) = reply.logged {
                        eprintln!("warning: interaction not logged: {e}");
                    }
                }
                Err(e) => eprintln!("\nerror: {e}"),
            },
            () = interrupted() => {
                eprintln!("\nturn cancelled");
            }
        }
    }
    Ok(())
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

/// Next question from the prompt, skipping blank lines.
///
/// Returns `None` on a stop word, end of input or `interrupt`.
async fn next_question<R>(
    lines: &mut Lines<R>,
    interrupt: impl Future<Output = ()>,
) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    tokio::pin!(interrupt);
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            () = &mut interrupt => return Ok(None),
        };
        let Some(line) = line else {
            return Ok(None);
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if STOP_WORDS.contains(&question.to_lowercase().as_str()) {
            return Ok(None);
        }
        return Ok(Some(question.to_owned()));
    }
}

async fn run_ask(config: Config, question: &str) -> anyhow::Result<()> {
    let ctx = AppContext::from_config(config)?;
    let mut session = ChatSession::new(&ctx);
    let reply = session.ask(question, print_update).await?;
    println!();
    if let Err(e) = reply.logged {
        eprintln!("warning: interaction not logged: {e}");
    }
    Ok(())
}

fn print_update(update: &StreamUpdate) {
    match update {
        StreamUpdate::Delta(text) => {
            print!("{text}");
            let _ = std::io::stdout().flush();
        }
        StreamUpdate::ToolCall { name, args } => {
            eprintln!("[{name}] {args}");
        }
        StreamUpdate::Done(_) => {}
    }
}

fn run_index(config: &Config, query: Option<&str>) -> anyhow::Result<()> {
    let corpus = context::load_corpus(config)?;
    let items = context::prepare_items(config, &corpus.documents)?;
    let index = Index::build(items, &context::index_fields(config));

    println!("Documents: {}", corpus.documents.len());
    println!("Skipped:   {}", corpus.skipped);
    println!("Items:     {}", index.len());

    if let Some(query) = query {
        println!();
        let hits = index.search(query, docent_tools::SEARCH_RESULT_LIMIT);
        if hits.is_empty() {
            println!("No results.");
        }
        for (i, hit) in hits.iter().enumerate() {
            let preview: String = hit.content.chars().take(80).collect();
            println!("{}. {} @{}", i + 1, hit.path, hit.start);
            println!("   {}", preview.replace('\n', " "));
        }
    }
    Ok(())
}

async fn run_eval(config: Config, logs: Option<PathBuf>) -> anyhow::Result<()> {
    let dir = logs.unwrap_or_else(|| config.logs.directory.clone());
    let store = LogStore::new(&dir);
    println!("Looking for logs in: {}", dir.display());

    let loaded = store
        .load_all()
        .with_context(|| format!("failed to read log directory {}", dir.display()))?;
    if loaded.records.is_empty() {
        println!("No log files found. Run `docent generate` first to create interactions.");
        return Ok(());
    }
    println!(
        "Found {} log files. Running evaluation...\n",
        loaded.records.len()
    );

    let provider = context::create_provider(&config, &config.eval.judge_model)?;
    let judge = Judge::new(provider);
    let mut run = judge
        .evaluate_all(&loaded.records, |i, total, question| {
            let preview: String = question.chars().take(60).collect();
            println!("[{i}/{total}] Evaluating: {preview}...");
        })
        .await?;
    run.skipped += loaded.skipped;

    println!("\n{}", Report::aggregate(&run).render());
    Ok(())
}

async fn run_generate(config: Config, samples: Option<usize>) -> anyhow::Result<()> {
    let sample_size = samples.unwrap_or(config.datagen.sample_size);
    let generator_provider = context::create_provider(&config, &config.datagen.model)?;
    let instructions = config.datagen.instructions.clone();
    let ctx = AppContext::from_config(config)?;

    let sample = {
        let mut rng = rand::thread_rng();
        docent_eval::sample_documents(ctx.documents(), sample_size, &mut rng)
    };
    println!("Generating questions from {} documents...", sample.len());

    let generator = QuestionGenerator::new(generator_provider, instructions);
    let questions = generator.generate(&sample).await?;
    println!(
        "Generated {} questions. Running {} ({})...\n",
        questions.len(),
        ctx.agent().name(),
        ctx.agent().provider().model()
    );

    let turns = docent_eval::run_agent_on_questions(
        ctx.agent(),
        ctx.log_store(),
        &questions,
        |turn| {
            println!("Q: {}", turn.question);
            println!("A: {}\n", turn.answer);
        },
    )
    .await?;

    let logged = turns.iter().filter(|t| t.logged.is_ok()).count();
    println!(
        "Done. {logged} interactions logged as {}.",
        LogSource::AiGenerated
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use tokio::io::BufReader;

    use super::*;

    fn lines(input: &'static str) -> Lines<BufReader<&'static [u8]>> {
        BufReader::new(input.as_bytes()).lines()
    }

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let mut input = lines("\n   \n  What is binning?  \nnext\n");
        let q = next_question(&mut input, std::future::pending()).await.unwrap();
        assert_eq!(q.as_deref(), Some("What is binning?"));
        let q = next_question(&mut input, std::future::pending()).await.unwrap();
        assert_eq!(q.as_deref(), Some("next"));
    }

    #[tokio::test]
    async fn stop_words_and_end_of_input_end_the_loop() {
        for input in ["stop\n", "QUIT\n", " exit \n", ""] {
            let q = next_question(&mut lines(input), std::future::pending())
                .await
                .unwrap();
            assert_eq!(q, None, "input {input:?}");
        }
    }

    #[tokio::test]
    async fn interrupt_at_prompt_ends_the_loop() {
        // The writer stays open, so reading would wait forever.
        let (_writer, reader) = tokio::io::duplex(64);
        let mut input = BufReader::new(reader).lines();
        let q = next_question(&mut input, std::future::ready(())).await.unwrap();
        assert_eq!(q, None);
    }
}
