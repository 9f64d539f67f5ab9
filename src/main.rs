use semdex::{IndexBuildPipeline, QueryPipeline, ResultBoard, SemdexConfig, Seed, Session};
use tracing_subscriber::EnvFilter;

const PHRASES: [&str; 4] = [
    "That is a very happy Person",
    "That is a Happy Dog",
    "Today is a sunny day",
    "Yesterday is a sunny day",
];

const QUERIES: [&str; 4] = [
    "That is a happy person",
    "That is a happy Person",
    "sunny",
    "sunny day",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Semdex v{}", semdex::version());
    println!("==========================================");
    println!();

    let config = match std::env::args().nth(1) {
        Some(path) => SemdexConfig::from_file(path)?,
        None => SemdexConfig::default(),
    };

    let session = Session::from_config(&config);
    session.start()?;
    println!("Loading index engine and embedding provider...");
    let handles = session.wait_ready().await?;
    println!("✓ Ready ({} dims, provider {})", handles.provider.dimensions(), handles.provider.name());

    let corpus: Vec<Seed> = PHRASES
        .iter()
        .enumerate()
        .map(|(i, text)| Seed::new(i.to_string(), *text, format!("/path/{}", i), *text))
        .collect();

    let report = IndexBuildPipeline::from_config(corpus, &config.pipeline)
        .run(&session)
        .await?;
    println!(
        "✓ Indexed {} phrases (generation {}, {:?})",
        report.documents, report.generation, report.elapsed
    );

    let pipeline = QueryPipeline::new(config.pipeline.top_k);
    let board = ResultBoard::new();
    for query in QUERIES {
        let results = pipeline.run(&session, query).await?;
        board.publish(results);

        if let Some(shown) = board.current() {
            println!("\nQuery: {:?}", shown.query);
            for (rank, neighbor) in shown.neighbors.iter().enumerate() {
                println!(
                    "  {}. {:<30} similarity {:.3}",
                    rank + 1,
                    neighbor.document.title,
                    neighbor.similarity
                );
            }
        }
    }

    session.cancel();
    Ok(())
}
