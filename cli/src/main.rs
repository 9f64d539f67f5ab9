//! Semdex CLI: index a corpus file and search it from the command line

use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use semdex::{
    IndexBuildPipeline, QueryPipeline, QueryResults, SemdexConfig, Seed, Session,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "semdex", version, about = "Semantic search over a small corpus")]
struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(long, global = true, env = "SEMDEX_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a corpus and run one query against it
    Search {
        /// JSON array of {id, title, url, text} records
        #[arg(long)]
        corpus: PathBuf,

        /// Number of neighbors to return
        #[arg(short, long)]
        k: Option<usize>,

        /// Query text
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Print the embedding of a text
    Embed {
        text: String,
    },
    /// Index a corpus and start an interactive query REPL
    Shell {
        #[arg(long)]
        corpus: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => SemdexConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SemdexConfig::default(),
    };

    let session = Session::from_config(&config);
    session.start()?;
    let handles = session.wait_ready().await?;

    match cli.command {
        Commands::Search { corpus, k, query } => {
            index_corpus(&session, &config, &corpus).await?;
            let pipeline = QueryPipeline::new(k.unwrap_or(config.pipeline.top_k));
            let results = pipeline.run(&session, &query.join(" ")).await?;
            print_results(&results, &cli.format)?;
        }
        Commands::Embed { text } => {
            let embedding = handles.provider.embed(&text).await?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string(&embedding)?),
                OutputFormat::Table => {
                    println!("{} ({} dims)", handles.provider.name(), embedding.len());
                    let cells: Vec<String> = embedding.iter().map(|v| format!("{:.4}", v)).collect();
                    println!("[{}]", cells.join(", "));
                }
            }
        }
        Commands::Shell { corpus } => {
            index_corpus(&session, &config, &corpus).await?;
            run_shell(&session, &config, &cli.format).await?;
        }
    }

    session.cancel();
    Ok(())
}

fn load_corpus(path: &Path) -> anyhow::Result<Vec<Seed>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading corpus {}", path.display()))?;
    let seeds = serde_json::from_str(&raw)
        .with_context(|| format!("parsing corpus {}", path.display()))?;
    Ok(seeds)
}

async fn index_corpus(session: &Session, config: &SemdexConfig, path: &Path) -> anyhow::Result<()> {
    let corpus = load_corpus(path)?;
    let report = IndexBuildPipeline::from_config(corpus, &config.pipeline)
        .run(session)
        .await?;
    eprintln!(
        "Indexed {} documents (generation {}, {} ms)",
        report.documents,
        report.generation,
        report.elapsed.as_millis()
    );
    Ok(())
}

async fn run_shell(
    session: &Session,
    config: &SemdexConfig,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    println!("Semdex Interactive Shell");
    println!("Type a query, or :help for commands. :quit to exit.\n");

    let mut pipeline = QueryPipeline::new(config.pipeline.top_k);
    let stdin = std::io::stdin();
    let mut line = String::new();

    loop {
        eprint!("semdex> ");

        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break; // EOF
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match trimmed {
            ":quit" | ":exit" | ":q" => break,
            ":help" | ":h" => {
                println!("Commands:");
                println!("  :k <n>    Set the number of neighbors (now {})", pipeline.k());
                println!("  :status   Show index status");
                println!("  :quit     Exit shell");
                println!("  <text>    Search the corpus");
            }
            ":status" => match session.handles() {
                Ok(handles) => {
                    println!("Session:    {}", session.id());
                    println!("Generation: {}", handles.index.generation());
                    println!("Documents:  {}", handles.index.len());
                    println!("Metric:     {}", handles.index.metric());
                    println!("Provider:   {}", handles.provider.name());
                }
                Err(e) => eprintln!("Error: {}", e),
            },
            cmd if cmd.starts_with(":k") => match cmd[2..].trim().parse::<usize>() {
                Ok(k) => pipeline = QueryPipeline::new(k),
                Err(_) => eprintln!("Usage: :k <n>"),
            },
            query => match pipeline.run(session, query).await {
                Ok(results) => print_results(&results, format)?,
                Err(e) => eprintln!("Error: {}", e),
            },
        }
    }

    println!("Bye!");
    Ok(())
}

fn print_results(results: &QueryResults, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let hits: Vec<serde_json::Value> = results
                .neighbors
                .iter()
                .map(|n| {
                    serde_json::json!({
                        "id": n.document.id,
                        "title": n.document.title,
                        "url": n.document.url,
                        "distance": n.distance,
                        "similarity": n.similarity,
                    })
                })
                .collect();
            let body = serde_json::json!({
                "query": results.query,
                "generation": results.generation,
                "neighbors": hits,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Table => {
            if results.neighbors.is_empty() {
                println!("(no results)");
                return Ok(());
            }

            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["#", "id", "title", "url", "similarity"]);
            for (rank, n) in results.neighbors.iter().enumerate() {
                table.add_row(vec![
                    (rank + 1).to_string(),
                    n.document.id.clone(),
                    n.document.title.clone(),
                    n.document.url.clone(),
                    format!("{:.4}", n.similarity),
                ]);
            }

            println!("{}", table);
            println!("{} result(s)", results.neighbors.len());
        }
    }
    Ok(())
}
