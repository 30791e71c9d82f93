use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::net::TcpListener;

use crate::core::{
    DistributionConfig, ExecutionMode, HistogramRenderer, SeriesQuantiles, SimulationError,
    SimulationResult, SimulationRunner, SummaryStatistics, SvgHistogramRenderer,
};

const API_DEFAULT_SEED: u64 = 42;
const API_MAX_ITERATIONS: u64 = 1_000_000;
const API_MAX_WORKERS: usize = 64;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "projections",
    version,
    about = "Monte Carlo projection of period and annualized returns"
)]
pub struct Cli {
    #[arg(long, allow_negative_numbers = true, help = "Mean of the annualized return distribution")]
    mu: f64,
    #[arg(long, help = "Volatility of the annualized return distribution")]
    sigma: f64,
    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Upper rejection bound on the per-period raw sample"
    )]
    upper: f64,
    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Lower rejection bound on the per-period raw sample"
    )]
    lower: f64,
    #[arg(long, help = "Fractional discount applied to the period return (0 <= d < 1)")]
    discount: f64,
    #[arg(long, default_value_t = 12, help = "Period length in months")]
    period: u32,
    #[arg(long, help = "Number of draws to simulate")]
    iterations: u64,
    #[arg(long, help = "Write a histogram of the raw samples to this path (SVG)")]
    histogram_file: Option<PathBuf>,
    #[arg(long, help = "RNG seed; derived from the clock when omitted")]
    seed: Option<u64>,
    #[arg(long, default_value_t = 1, help = "Worker threads; more than one runs in parallel")]
    workers: usize,
    #[arg(long, help = "Print the report as JSON")]
    json: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    mu: Option<f64>,
    sigma: Option<f64>,
    upper: Option<f64>,
    lower: Option<f64>,
    discount: Option<f64>,
    period: Option<u32>,
    iterations: Option<u64>,
    seed: Option<u64>,
    workers: Option<usize>,
}

#[derive(Debug)]
struct ApiRequest {
    config: DistributionConfig,
    mode: ExecutionMode,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulationReport {
    config: DistributionConfig,
    sample_stats: SummaryStatistics,
    period_return_stats: SummaryStatistics,
    annual_return_stats: SummaryStatistics,
    quantiles: SeriesQuantiles,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn build_config(cli: &Cli) -> Result<DistributionConfig, SimulationError> {
    let config = DistributionConfig {
        mu: cli.mu,
        sigma: cli.sigma,
        lower_bound: cli.lower,
        upper_bound: cli.upper,
        discount: cli.discount,
        period_months: cli.period,
        iteration_count: cli.iterations,
        seed: cli.seed.unwrap_or_else(clock_seed),
    };
    config.validate()?;
    Ok(config)
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(API_DEFAULT_SEED)
}

/// Runs one simulation from command-line arguments. Returns the process exit code.
pub fn run_cli(cli: Cli) -> i32 {
    let stdout = io::stdout();
    run_cli_to(cli, &mut stdout.lock())
}

fn run_cli_to<W: Write>(cli: Cli, out: &mut W) -> i32 {
    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    let result = match SimulationRunner::new(config.clone())
        .with_mode(ExecutionMode::from_workers(cli.workers))
        .run()
    {
        Ok(result) => result,
        Err(e) => {
            error!("simulation failed: {e}");
            eprintln!("{e}");
            return 1;
        }
    };

    let report = if cli.json {
        match serde_json::to_string_pretty(&build_report(config, &result)) {
            Ok(json) => json + "\n",
            Err(e) => {
                eprintln!("failed to encode report: {e}");
                return 1;
            }
        }
    } else {
        format_text_report(&result)
    };
    if let Err(e) = out.write_all(report.as_bytes()) {
        eprintln!("failed to write report: {e}");
        return 1;
    }

    if let Some(path) = &cli.histogram_file {
        match SvgHistogramRenderer::default().render(&result.series.raw_samples, path) {
            Ok(()) => info!("wrote histogram to {}", path.display()),
            Err(e) => {
                error!("histogram render failed for {}: {e}", path.display());
                eprintln!("histogram not written: {e}");
            }
        }
    }

    if !cli.json && writeln!(out, "done").is_err() {
        return 1;
    }
    0
}

fn format_text_report(result: &SimulationResult) -> String {
    let mut out = String::new();
    for (label, stats) in [
        ("SAMPLES STATS:", result.sample_stats),
        ("PERIOD RETURNS STATS:", result.period_return_stats),
        ("ANNUAL RETURNS STATS:", result.annual_return_stats),
    ] {
        out.push_str(label);
        out.push('\n');
        out.push_str(&format!(
            "{{ mean: {}, variance: {} }}\n",
            stats.mean, stats.variance
        ));
    }
    out
}

fn build_report(config: DistributionConfig, result: &SimulationResult) -> SimulationReport {
    SimulationReport {
        config,
        sample_stats: result.sample_stats,
        period_return_stats: result.period_return_stats,
        annual_return_stats: result.annual_return_stats,
        quantiles: result.quantiles.clone(),
    }
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!("projection HTTP API listening on http://{addr}");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let config = request.config.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        SimulationRunner::new(request.config)
            .with_mode(request.mode)
            .run()
    })
    .await;

    match outcome {
        Ok(Ok(result)) => json_response(StatusCode::OK, build_report(config, &result)),
        Ok(Err(e)) => {
            warn!("simulation rejected: {e}");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
        Err(e) => {
            error!("simulation task failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "simulation task failed")
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: SimulatePayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    let Some(mu) = payload.mu else {
        return Err("mu is required".to_string());
    };
    let Some(sigma) = payload.sigma else {
        return Err("sigma is required".to_string());
    };
    cli.mu = mu;
    cli.sigma = sigma;

    if let Some(v) = payload.upper {
        cli.upper = v;
    }
    if let Some(v) = payload.lower {
        cli.lower = v;
    }
    if let Some(v) = payload.discount {
        cli.discount = v;
    }
    if let Some(v) = payload.period {
        cli.period = v;
    }
    if let Some(v) = payload.iterations {
        cli.iterations = v;
    }
    if let Some(v) = payload.seed {
        cli.seed = Some(v);
    }
    if let Some(v) = payload.workers {
        cli.workers = v;
    }

    if cli.iterations > API_MAX_ITERATIONS {
        return Err(format!("iterations must be <= {API_MAX_ITERATIONS}"));
    }
    if cli.workers > API_MAX_WORKERS {
        return Err(format!("workers must be <= {API_MAX_WORKERS}"));
    }

    let config = build_config(&cli).map_err(|e| e.to_string())?;
    Ok(ApiRequest {
        config,
        mode: ExecutionMode::from_workers(cli.workers),
    })
}

fn default_cli_for_api() -> Cli {
    Cli {
        mu: 0.0,
        sigma: 0.0,
        upper: 1.0,
        lower: -1.0,
        discount: 0.0,
        period: 12,
        iterations: 10_000,
        histogram_file: None,
        seed: Some(API_DEFAULT_SEED),
        workers: 1,
        json: false,
    }
}
