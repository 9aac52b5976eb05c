use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use clap::{Parser, Subcommand};
use eyre::{eyre, OptionExt, Result};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::auth_layer::session_auth_middleware;
use crate::config::Config;
use crate::error::ServerError;
use crate::forms::SignupForm;
use crate::memory_store::MemoryStore;
use crate::pg_store::PgStore;
use crate::service::ServiceState;
use crate::store::Store;
use crate::user_repo::UserRepository;

mod account_handlers;
mod auth_layer;
mod config;
mod error;
mod forms;
mod memory_store;
mod password;
mod pg_store;
mod schema;
mod service;
mod store;
mod tweet_handlers;
mod tweet_models;
mod tweet_repo;
mod user_models;
mod user_repo;

#[cfg(test)]
mod test_util;

// session token is sent back in this header on signup/login
// and expected as `Authorization: Bearer <token>` afterwards
const SESSION_TOKEN_HEADER: &str = "x-session-token";
const HOME_PATH: &str = "/tweets/home";
const LOGIN_PATH: &str = "/accounts/login";

type ServiceArcState<S> = State<Arc<ServiceState<S>>>;

#[derive(Parser, Debug)]
#[command(name = "twitline")]
#[command(about = "Twitline server binary")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the server
    #[command(name = "run")]
    Run {
        /// Address to listen on, overrides BIND_ADDR
        #[arg(long)]
        bind: Option<String>,
        /// Keep all data in memory even if DATABASE_URL is set
        #[arg(long)]
        in_memory: bool,
    },
    /// Create a user in the configured database and exit
    #[command(name = "create-user", arg_required_else_help = true)]
    CreateUser {
        #[arg(required = true)]
        username: String,
        #[arg(required = true)]
        email: String,
        #[arg(required = true)]
        password: String,
    },
}

/// 302 redirect to `location`.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

fn app<S: Store>(state: Arc<ServiceState<S>>) -> Router {
    let protected = Router::new()
        .route("/", get(|| async { found(HOME_PATH) }))
        .route("/accounts/:username", get(account_handlers::user_profile::<S>))
        .route("/accounts/:username/follow", post(account_handlers::follow::<S>))
        .route("/accounts/:username/unfollow", post(account_handlers::unfollow::<S>))
        .route("/accounts/:username/following", get(account_handlers::following_list::<S>))
        .route("/accounts/:username/follower", get(account_handlers::follower_list::<S>))
        .route("/tweets/home", get(tweet_handlers::home::<S>))
        .route("/tweets/create", get(tweet_handlers::create_form).post(tweet_handlers::create::<S>))
        .route("/tweets/:id", get(tweet_handlers::detail::<S>))
        .route("/tweets/:id/delete", post(tweet_handlers::delete::<S>))
        .route("/tweets/:id/like", post(tweet_handlers::like::<S>))
        .route("/tweets/:id/unlike", post(tweet_handlers::unlike::<S>))
        .route_layer(from_fn_with_state(state.clone(), session_auth_middleware::<S>));

    Router::new()
        .route("/accounts/signup", get(account_handlers::signup_form).post(account_handlers::signup::<S>))
        .route("/accounts/login", get(account_handlers::login_form).post(account_handlers::login::<S>))
        .route("/accounts/logout", post(account_handlers::logout::<S>))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn serve<S: Store>(store: S, config: &Config, bind_addr: &str) -> Result<()> {
    let state = Arc::new(ServiceState::new(store).with_session_ttl(config.session_ttl));
    let app = app(state);

    debug!("Running on {}", bind_addr);
    let tcp_listener = TcpListener::bind(bind_addr).await?;
    axum::serve(tcp_listener, app).await?;
    Ok(())
}

async fn create_user(config: &Config, form: SignupForm) -> Result<()> {
    let database_url = config
        .database_url
        .as_deref()
        .ok_or_eyre("DATABASE_URL must be set to create a user")?;
    let state = ServiceState::new(PgStore::connect(database_url, 1)?);
    let user = state.signup(form).await.map_err(|e| match e {
        ServerError::Validation(errors) => eyre!("Invalid user: {:?}", errors.errors),
        e => e.into(),
    })?;
    info!("Created user {} with id {}", user.username, user.id);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // axum logs rejections from built-in extractors with the `axum::rejection`
                // target, at `TRACE` level. `axum::rejection=trace` enables showing those events
                "twitline_server=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::load()?;

    match args.command {
        Commands::CreateUser { username, email, password } => {
            let form = SignupForm {
                username,
                email,
                password1: password.clone(),
                password2: password,
            };
            create_user(&config, form).await
        }
        Commands::Run { bind, in_memory } => {
            let bind_addr = bind.unwrap_or(config.bind_addr.clone());
            match config.database_url.as_deref() {
                Some(database_url) if !in_memory => {
                    debug!("Initializing database resources");
                    serve(PgStore::connect(database_url, config.db_pool_size)?, &config, &bind_addr).await
                }
                _ => {
                    warn!("Keeping all data in memory, it is lost on shutdown");
                    serve(MemoryStore::default(), &config, &bind_addr).await
                }
            }
        }
    }
}
