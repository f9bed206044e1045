//! Interactive chat REPL
//!
//! Creates a session, loads its history, and loops: read a question, run
//! one agent turn, print the answer with a tag showing whether internal
//! documents were consulted. A capability failure fails the turn, not the
//! session.

use clap::Parser;
use console::style;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use intra_rag::agent::ConversationAgent;
use intra_rag::config::RagConfig;
use intra_rag::history::{ChatHistoryStore, SqliteHistoryStore};
use intra_rag::providers::{EmbeddingProvider, LlmProvider, OpenAiClient, QdrantStore};
use intra_rag::retrieval::RetrievalGateway;
use intra_rag::types::TurnRequest;

#[derive(Parser)]
#[command(name = "intra-rag-chat", about = "Internal-documents QA assistant")]
struct Args {
    /// User id the session is created for
    #[arg(long, default_value = "local-user")]
    user: String,

    /// Department scope for retrieval; omit to search common documents only
    #[arg(long)]
    department: Option<i64>,

    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intra_rag=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = RagConfig::load_or_default(args.config.as_deref())?;

    let client = Arc::new(OpenAiClient::new(&config.llm, config.vector_db.vector_size)?);
    let embedder: Arc<dyn EmbeddingProvider> = client.clone();
    let llm: Arc<dyn LlmProvider> = client;

    if !llm.health_check().await.unwrap_or(false) {
        println!(
            "{} LLM endpoint not reachable at {}",
            style("warning:").yellow().bold(),
            config.llm.base_url
        );
    }

    let store = Arc::new(QdrantStore::new(&config.vector_db)?);
    let retrieval = RetrievalGateway::new(embedder, store, config.retrieval.clone());

    let history = Arc::new(SqliteHistoryStore::new(&config.history.db_path)?);
    let agent = ConversationAgent::new(
        &config,
        llm,
        retrieval,
        Arc::clone(&history) as Arc<dyn ChatHistoryStore>,
    );

    let session_id = history.create_session(&args.user)?;
    println!(
        "{} (session {}, 종료: exit)",
        style("사내 문서 QA 어시스턴트").bold(),
        session_id
    );

    let stdin = io::stdin();
    loop {
        print!("\n질문을 입력하세요: ");
        io::stdout().flush()?;

        let mut question = String::new();
        if stdin.lock().read_line(&mut question)? == 0 {
            break;
        }
        let question = question.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") {
            println!("세션을 종료합니다.");
            break;
        }

        let request = TurnRequest {
            session_id: session_id.clone(),
            question: question.to_string(),
            department_id: args.department,
        };

        match agent.run_turn(&request).await {
            Ok(result) => {
                let tag = if result.used_retrieval {
                    style("[RAG 사용]").green()
                } else {
                    style("[RAG 미사용]").dim()
                };
                println!("\n{tag}");
                println!("{}", result.answer);
                if result.rewrite_count > 0 {
                    println!(
                        "{}",
                        style(format!("(질문 재작성 {}회)", result.rewrite_count)).dim()
                    );
                }
            }
            Err(e) if e.is_capability() => {
                println!("{} {}", style("turn failed:").red().bold(), e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
