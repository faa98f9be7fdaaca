use axum::{
    Router,
    extract::Extension,
    response::{Html, IntoResponse},
    routing::{delete, get, get_service, post},
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tera::{Context, Tera};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

mod clock;
mod practice;
mod quests;
mod review;
mod services;
mod srs;
mod state;
mod storage;
mod streak;
mod vocabulary;

use services::GeminiClient;
use state::{AppState, SharedState};
use storage::FileStore;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    // Local persistence
    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "data".into());
    let store = match FileStore::new(PathBuf::from(&data_dir)) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to open data directory {}: {}", data_dir, e);
            std::process::exit(1);
        }
    };
    let state: SharedState = Arc::new(Mutex::new(AppState::load(Box::new(store))));

    // External text/image services
    let gemini = Arc::new(GeminiClient::new(
        std::env::var("GEMINI_API_KEY").unwrap_or_default(),
        std::env::var("UNSPLASH_ACCESS_KEY").unwrap_or_default(),
    ));

    // Templates configuration
    let templates = match Tera::new("templates/**/*.html") {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Template parsing error: {}", e);
            std::process::exit(1);
        }
    };
    let templates = Arc::new(templates);

    let api_state = (state.clone(), gemini.clone());

    // Practice API router
    let practice_router = Router::new()
        .route("/generate", post(practice::generate))
        .route("/submit", post(practice::submit))
        .route("/analyze", post(practice::analyze))
        .with_state(api_state.clone());

    // Vocabulary API router
    let vocab_router = Router::new()
        .route("/", get(vocabulary::list_words).post(vocabulary::save_word))
        .route("/lookup", post(vocabulary::lookup_word))
        .route("/{word}", delete(vocabulary::remove_word))
        .with_state(api_state.clone());

    // Review session API router
    let review_router = Router::new()
        .route("/start", post(review::start_review))
        .route("/question", get(review::review_question))
        .route("/answer", post(review::review_answer))
        .route("/finish", post(review::finish_review))
        .with_state(api_state.clone());

    // Combined API router
    let api_router = Router::new()
        .route("/progress", get(practice::progress))
        .with_state(api_state)
        .nest("/practice", practice_router)
        .nest("/vocab", vocab_router)
        .nest("/review", review_router);

    // Main application router
    let app = Router::new()
        .route("/", get(home))
        .nest("/api", api_router)
        .nest_service("/static", get_service(ServeDir::new("static")))
        .layer(Extension(templates));

    // Start server
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:5000".into());
    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };

    println!("Server running on http://{}", bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn home(Extension(templates): Extension<Arc<Tera>>) -> impl IntoResponse {
    Html(
        templates
            .render("index.html", &Context::new())
            .unwrap_or_else(|_| "Error rendering template: index.html".to_string()),
    )
}
