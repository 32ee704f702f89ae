//! Alumnium MCP Server
//!
//! This binary runs an MCP server for natural-language browser and mobile
//! automation, over stdin/stdout by default or over Streamable HTTP.

use alumnium_mcp::driver::{DriverStrategies, WebDriverClient};
use alumnium_mcp::engine::RemoteEngineFactory;
use alumnium_mcp::{AlumniumMcpServer, ServerMode, SessionManager, Settings};
use bytes::Bytes;
use clap::{Args, Parser, Subcommand};
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::http::{header::ORIGIN, Request, Response, StatusCode};
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use rmcp::transport::stdio;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use rmcp::ServiceExt;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tower_service::Service;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "alumnium-mcp",
    version,
    about = "MCP server for natural-language UI automation"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    /// Model as provider/name (overrides ALUMNIUM_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,
    /// Upper bound for a single driver or engine call, in seconds
    #[arg(long, global = true)]
    call_timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the MCP server over stdio (default)
    Serve,
    /// Run the MCP server over Streamable HTTP (SSE)
    ServeHttp(ServeHttpArgs),
}

#[derive(Args)]
struct ServeHttpArgs {
    /// Bind address (e.g., 127.0.0.1:8765)
    #[arg(long, default_value = "127.0.0.1:8765")]
    bind: String,
    /// SSE keep-alive interval in seconds (0 disables)
    #[arg(long, default_value_t = 15)]
    sse_keep_alive_secs: u64,
    /// Use stateless mode (POST only; no sessions)
    #[arg(long)]
    stateless: bool,
    /// Allowed Origin values (comma-separated). Defaults to localhost only.
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "http://localhost,http://127.0.0.1"
    )]
    allow_origin: Vec<String>,
}

#[derive(Clone)]
struct OriginCheckService<S> {
    inner: S,
    allowed_origins: Arc<HashSet<String>>,
}

impl<S> OriginCheckService<S> {
    fn new(inner: S, allowed_origins: Arc<HashSet<String>>) -> Self {
        Self {
            inner,
            allowed_origins,
        }
    }
}

fn forbidden() -> Response<BoxBody<Bytes, std::convert::Infallible>> {
    let mut resp = Response::new(Full::new(Bytes::from("Forbidden")).boxed());
    *resp.status_mut() = StatusCode::FORBIDDEN;
    resp
}

impl<B, S> Service<Request<B>> for OriginCheckService<S>
where
    B: http_body::Body + Send + 'static,
    B::Error: std::fmt::Display,
    S: Service<
            Request<B>,
            Response = Response<BoxBody<Bytes, std::convert::Infallible>>,
            Error = std::convert::Infallible,
        > + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<BoxBody<Bytes, std::convert::Infallible>>;
    type Error = std::convert::Infallible;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let allowed_origins = self.allowed_origins.clone();
        let mut inner = self.inner.clone();
        Box::pin(async move {
            if let Some(origin) = req.headers().get(ORIGIN).and_then(|v| v.to_str().ok()) {
                if !allowed_origins.contains(origin) {
                    return Ok(forbidden());
                }
            }
            inner.call(req).await
        })
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logging to stderr (stdout is used for MCP protocol)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("alumnium_mcp=info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    info!(
        model = %settings.model,
        engine = %settings.engine_url,
        call_timeout_secs = settings.call_timeout.as_secs(),
        "Settings resolved"
    );

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => rt.block_on(run_server(settings)),
        Command::ServeHttp(args) => rt.block_on(run_server_http(settings, args)),
    }
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = Settings::from_env()?;
    if let Some(model) = cli.model.as_deref() {
        settings = settings.with_model(model)?;
    }
    if let Some(secs) = cli.call_timeout_secs {
        settings = settings.with_call_timeout_secs(secs)?;
    }
    Ok(settings)
}

fn build_manager(settings: Settings) -> Arc<SessionManager> {
    let strategies = DriverStrategies::from_settings(&settings, WebDriverClient::default());
    let engines = Arc::new(RemoteEngineFactory::new(&settings.engine_url));
    Arc::new(SessionManager::new(settings, strategies, engines))
}

async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigquit = signal(SignalKind::quit())?;
        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
            _ = sigquit.recv() => {},
            _ = tokio::signal::ctrl_c() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }

    Ok(())
}

async fn run_server(settings: Settings) -> anyhow::Result<()> {
    info!("Starting Alumnium MCP Server (stdio mode)");

    let manager = build_manager(settings);
    let server = AlumniumMcpServer::new(manager.clone(), ServerMode::Stdio);
    let mut service = Some(server.serve(stdio()).await?);
    info!("MCP server listening on stdio");

    let shutdown_notify = Arc::new(Notify::new());
    let shutdown_signal = shutdown_notify.clone();
    tokio::spawn(async move {
        if wait_for_shutdown_signal().await.is_ok() {
            info!("Shutdown signal received");
            shutdown_signal.notify_one();
        } else {
            info!("Shutdown signal handler failed; server will continue running");
        }
    });

    loop {
        tokio::select! {
            _ = shutdown_notify.notified() => {
                if let Some(mut running) = service.take() {
                    let _ = running.close().await?;
                }
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(200)) => {
                if let Some(running) = service.as_ref() {
                    if running.is_transport_closed() {
                        if let Some(running) = service.take() {
                            let _ = running.waiting().await?;
                        }
                        break;
                    }
                }
            }
        }
    }

    info!("MCP server shutting down");
    manager.shutdown_all().await;
    info!("Server stopped");
    Ok(())
}

async fn run_server_http(settings: Settings, args: ServeHttpArgs) -> anyhow::Result<()> {
    info!("Starting Alumnium MCP Server (streamable HTTP mode)");

    let bind_addr: SocketAddr = args
        .bind
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address: {e}"))?;

    let manager = build_manager(settings);
    let session_manager = Arc::new(LocalSessionManager::default());
    let cancel = tokio_util::sync::CancellationToken::new();
    let config = StreamableHttpServerConfig {
        sse_keep_alive: if args.sse_keep_alive_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(args.sse_keep_alive_secs))
        },
        sse_retry: None,
        stateful_mode: !args.stateless,
        cancellation_token: cancel.clone(),
    };

    // Every HTTP session shares one manager, so handles outlive the
    // connection that created them.
    let manager_for_factory = manager.clone();
    let service = StreamableHttpService::new(
        move || {
            Ok(AlumniumMcpServer::new(
                manager_for_factory.clone(),
                ServerMode::Http,
            ))
        },
        session_manager,
        config,
    );
    let allowed_origins: HashSet<String> = args
        .allow_origin
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let service = OriginCheckService::new(service, Arc::new(allowed_origins));

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("bind failed: {e}"))?;
    info!("MCP HTTP server listening on http://{bind_addr}");

    let cancel_for_shutdown = cancel.clone();
    tokio::spawn(async move {
        if wait_for_shutdown_signal().await.is_ok() {
            info!("Shutdown signal received");
            cancel_for_shutdown.cancel();
        }
    });

    let result: anyhow::Result<()> = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("HTTP server shutting down");
                break Ok(());
            }
            res = listener.accept() => {
                let (stream, _) = match res {
                    Ok(accepted) => accepted,
                    Err(e) => break Err(anyhow::anyhow!("accept failed: {e}")),
                };
                let svc = service.clone();
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let conn = http1::Builder::new().serve_connection(
                        io,
                        TowerToHyperService::new(svc),
                    );
                    if let Err(err) = conn.await {
                        error!("http connection error: {err}");
                    }
                });
            }
        }
    };

    manager.shutdown_all().await;
    info!("Server stopped");
    result
}
