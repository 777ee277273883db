use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::error;

use ping_probe::channel::RawConnector;
use ping_probe::driver::Driver;
use ping_probe::protocol::AddressFamily;
use ping_probe::resolve::SystemResolver;
use ping_probe::settings::Settings;

/// Continuously ping a host and flag replies slower than a threshold.
#[derive(Debug, Parser)]
#[command(name = "ping-probe", version)]
struct Opt {
    /// Host name or IP address to probe
    address: String,

    /// Latency threshold in milliseconds
    threshold_ms: u64,

    /// Address family to try first: `ip4` or `ip6`
    family: AddressFamily,

    /// Seconds to wait between probes
    #[arg(long, default_value_t = 2)]
    interval: u64,

    /// Seconds to wait for each reply
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Failed probes in a row before giving up
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    max_failures: u32,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opt = match Opt::try_parse() {
        Ok(opt) => opt,
        Err(err) if err.use_stderr() => {
            let message = err.to_string();
            let first = message.lines().next().unwrap_or_default();
            error!("{}. Exiting...", first.trim_start_matches("error: "));
            return ExitCode::from(2);
        }
        Err(err) => {
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
    };

    let settings = Settings {
        threshold: Duration::from_millis(opt.threshold_ms),
        interval: Duration::from_secs(opt.interval),
        read_timeout: Duration::from_secs(opt.timeout),
        max_consecutive_failures: opt.max_failures,
    };
    let driver = Driver::new(opt.address, opt.family, settings, RawConnector, SystemResolver);

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for ctrl-c: {}", err);
            std::future::pending::<()>().await;
        }
    };

    let exit = driver.run(shutdown).await;
    ExitCode::from(exit.code())
}
