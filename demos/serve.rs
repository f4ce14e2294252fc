//! HTTP front end for workflow execution.
//!
//! Exposes a single `POST /execute-workflow` endpoint that accepts a
//! `{ nodes, edges }` payload and returns the per-node results map.
//! Structural problems (no start nodes, dangling edges, cycles, unknown
//! node types) come back as 400 with a `detail` message; anything else is
//! a 500.
//!
//! Run with:
//!   cargo run --example serve
//!
//! Then:
//!   curl -s http://127.0.0.1:8000/execute-workflow \
//!     -H 'content-type: application/json' \
//!     -d '{"nodes":[{"id":"c","type":"combineText"}],"edges":[]}'

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use vortexflow::{
    handlers::{CombineTextHandler, CultureFitHandler, COMBINE_TEXT, CULTURE_FIT},
    registry::HandlerRegistry,
    runner::{Runner, RunnerError},
    workflow::Workflow,
};

fn build_registry() -> HandlerRegistry {
    let registry = HandlerRegistry::new()
        .register(COMBINE_TEXT, Arc::new(CombineTextHandler))
        .register(CULTURE_FIT, Arc::new(CultureFitHandler));
    #[cfg(feature = "llm")]
    let registry = registry.register(
        vortexflow::handlers::ASK_AI,
        Arc::new(vortexflow::handlers::AskAiHandler::new()),
    );
    registry
}

fn error_response(err: &RunnerError) -> Response {
    use vortexflow::scheduler::SchedulerError;

    let status = match err {
        RunnerError::NoStartNodes | RunnerError::Workflow(_) => StatusCode::BAD_REQUEST,
        RunnerError::Scheduler(
            SchedulerError::CircularDependency { .. }
            | SchedulerError::UnknownNodeType { .. }
            | SchedulerError::MissingNode { .. },
        ) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "detail": err.to_string() }))).into_response()
}

async fn execute_workflow(
    State(runner): State<Arc<Runner>>,
    Json(workflow): Json<Workflow>,
) -> Response {
    match runner.run(workflow).await {
        Ok(report) => Json(json!({ "results": report.results })).into_response(),
        Err(err) => {
            tracing::error!(%err, "workflow execution failed");
            error_response(&err)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let runner = Arc::new(Runner::new(Arc::new(build_registry())));

    let cors = CorsLayer::new()
        .allow_origin([
            "http://localhost:5173".parse::<HeaderValue>()?,
            "http://localhost:5174".parse::<HeaderValue>()?,
            "http://localhost:3000".parse::<HeaderValue>()?,
        ])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any);

    let router = Router::new()
        .route("/execute-workflow", post(execute_workflow))
        .layer(cors)
        .with_state(runner);

    let addr: SocketAddr = "0.0.0.0:8000".parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Serving workflow execution on http://{addr}/execute-workflow");
    axum::serve(listener, router.into_make_service()).await?;

    Ok(())
}
