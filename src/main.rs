use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

fn print_usage_and_exit(program: &str, err: &anyhow::Error) -> ! {
    eprintln!("Error: {}\n", err);
    eprintln!("{}", facepay::cli::usage(program));
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut cfg = facepay::config::Config::from_env();
    let args: Vec<String> = std::env::args().collect();
    let program = args.first().cloned().unwrap_or_else(|| "facepay".to_string());
    let cmd = match facepay::cli::parse_args(&args[1.min(args.len())..], &mut cfg) {
        Ok(cmd) => cmd,
        Err(e) => print_usage_and_exit(&program, &e),
    };

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "facepay",
        "facepay starting: RUST_LOG='{}', ws_url={}, api_url={}, storage='{}'",
        rust_log, cfg.ws_url, cfg.api_url, cfg.storage_path.display()
    );

    facepay::cli::run(cmd, cfg).await
}
