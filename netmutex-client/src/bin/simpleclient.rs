//! # netmutex client binary
//!
//! Demo/ops tool mirroring the original `simpleclient`: connect, run one
//! `capture` or `release`, print the result. Flags are parsed by hand
//! (`--flag value` pairs), matching the workspace's no-CLI-crate precedent.

use std::env;

use netmutex_client::{Client, ClientResult};

struct Config {
    host: String,
    port: u16,
    operation: String,
    mutex: String,
    resource: String,
    timeout: u64,
    autorelease: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 8900,
            operation: "capture".to_string(),
            mutex: String::new(),
            resource: String::new(),
            timeout: 0,
            autorelease: false,
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
                "--port" => config.port = next_value(&mut args, "--port").parse().unwrap_or(8900),
                "--operation" => config.operation = next_value(&mut args, "--operation"),
                "--mutex" => config.mutex = next_value(&mut args, "--mutex"),
                "--resource" => config.resource = next_value(&mut args, "--resource"),
                "--timeout" => {
                    config.timeout = next_value(&mut args, "--timeout").parse().unwrap_or(0)
                }
                "--autorelease" => {
                    config.autorelease = parse_bool(&next_value(&mut args, "--autorelease"))
                }
                other => {
                    eprintln!("simpleclient: unrecognized argument '{other}'");
                    std::process::exit(2);
                }
            }
        }
        config
    }
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> String {
    args.next().unwrap_or_else(|| {
        eprintln!("simpleclient: '{flag}' requires a value");
        std::process::exit(2);
    })
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Fixed demo sequence, left unspecified by the flag table: capture a
/// one-off resource with a short lease, print the id, release it.
fn run_example(client: &mut Client) -> ClientResult<String> {
    let mutex = client.capture("simpleclient-example-resource", 5, false)?;
    client.release(&mutex)?;
    Ok(format!("Mutex id: {mutex}"))
}

fn main() {
    let config = Config::from_args();
    let addr = format!("{}:{}", config.host, config.port);

    let mut client = match Client::open(&addr) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("client connection error: {err}");
            std::process::exit(1);
        }
    };

    let outcome = match config.operation.as_str() {
        "capture" => client
            .capture(&config.resource, config.timeout, config.autorelease)
            .map(|mutex| format!("Mutex id: {mutex}")),
        "release" => client
            .release(&config.mutex)
            .map(|mutex| format!("Mutex id: {mutex}")),
        "example" => run_example(&mut client),
        other => {
            eprintln!("simpleclient: unknown operation '{other}' (use capture, release, or example)");
            std::process::exit(2);
        }
    };

    let exit_code = match outcome {
        Ok(message) => {
            println!("{message}");
            0
        }
        Err(err) => {
            println!("{} problem: {err}", config.operation);
            1
        }
    };

    let _ = client.close();
    std::process::exit(exit_code);
}
