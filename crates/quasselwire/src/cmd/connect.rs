use quasselwire_session::{run_session, ClientCommand, Credentials, Session, SessionConfig};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::cmd::{parse_duration, ConnectArgs};
use crate::exit::{io_error, session_error, CliResult, SUCCESS};
use crate::output::{EventPrinter, OutputFormat};

pub fn run(args: ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let config = session_config(&args)?;
    let credentials = Credentials::new(args.user, args.password);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))?;
    runtime.block_on(connect(&args.addr, config, credentials, format))
}

fn session_config(args: &ConnectArgs) -> CliResult<SessionConfig> {
    let heartbeat_interval = if args.no_heartbeat {
        None
    } else {
        Some(parse_duration(&args.heartbeat)?)
    };
    Ok(SessionConfig {
        heartbeat_interval,
        backlog_limit: args.backlog_limit,
        ..SessionConfig::default()
    })
}

async fn connect(
    addr: &str,
    config: SessionConfig,
    credentials: Credentials,
    format: OutputFormat,
) -> CliResult<i32> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|err| io_error(&format!("connect to {addr} failed"), err))?;
    if let Err(err) = stream.set_nodelay(true) {
        tracing::debug!(error = %err, "could not disable nagle");
    }
    tracing::info!(%addr, user = %credentials.user, "connected to core");

    let (commands_tx, commands) = mpsc::channel(8);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, disconnecting");
            let _ = commands_tx.send(ClientCommand::Disconnect).await;
        }
    });

    let mut session = Session::new(config, credentials);
    let mut printer = EventPrinter::new(format);
    run_session(stream, &mut session, commands, &mut printer)
        .await
        .map_err(|err| session_error("session failed", err))?;
    Ok(SUCCESS)
}
