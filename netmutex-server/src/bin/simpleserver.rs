//! # netmutex server binary
//!
//! Hand-rolled flag parsing, no external CLI crate: `--host` and `--port`
//! are the whole surface, which isn't worth a dependency.

use std::env;

use netmutex_server::{init_logging, Server};

struct Config {
    host: String,
    port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".to_string(),
            port: 8900,
        }
    }
}

impl Config {
    fn from_args() -> Self {
        let mut config = Config::default();
        let mut args = env::args().skip(1);
        while let Some(flag) = args.next() {
            match flag.as_str() {
                "--host" => config.host = next_value(&mut args, "--host"),
                "--port" => {
                    config.port = next_value(&mut args, "--port").parse().unwrap_or_else(|_| {
                        eprintln!("simpleserver: '--port' requires an integer");
                        std::process::exit(2);
                    })
                }
                other => {
                    eprintln!("simpleserver: unrecognized argument '{other}'");
                    std::process::exit(2);
                }
            }
        }
        config
    }
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> String {
    args.next().unwrap_or_else(|| {
        eprintln!("simpleserver: '{flag}' requires a value");
        std::process::exit(2);
    })
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_logging();
    let config = Config::from_args();
    let addr = format!("{}:{}", config.host, config.port);

    let server = match Server::bind(&addr).await {
        Ok(server) => server,
        Err(err) => {
            tracing::error!(%addr, error = %err, "bind failed");
            std::process::exit(1);
        }
    };
    let bound = server.local_addr()?;
    tracing::info!(addr = %bound, "netmutex server listening");

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, shutting down");
            shutdown.notify_one();
        }
    });

    server.run().await
}
