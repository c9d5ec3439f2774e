use std::process::ExitCode;

use neo4j_test_server::{init_logging, Bootstrapper, Settings};
use tracing::{error, info};

const USAGE: &str = "usage: neo4j-test-server <edition> [--port <port>]";

struct Args {
    edition: String,
    port: Option<u16>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = std::env::args().skip(1);
    let edition = args.next().ok_or_else(|| USAGE.to_string())?;
    let mut port = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--port" => {
                let raw = args.next().ok_or("--port needs a value")?;
                port = Some(
                    raw.parse::<u16>()
                        .map_err(|e| format!("invalid port {raw:?}: {e}"))?,
                );
            }
            other => return Err(format!("unexpected argument {other:?}\n{USAGE}")),
        }
    }

    Ok(Args { edition, port })
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    let settings = Settings::load(&Settings::default().package_root);
    let result = async {
        let bootstrapper = Bootstrapper::from_settings(&settings)?;
        let install_path = bootstrapper.bootstrap(&args.edition).await?;
        if let Some(port) = args.port {
            bootstrapper.configure_server(port).await?;
            info!("HTTP port set to {}", port);
        }
        Ok::<_, neo4j_test_server::BootstrapError>(install_path)
    }
    .await;

    match result {
        Ok(install_path) => {
            println!("{}", install_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
