use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};

use fnoter::config;
use fnoter::dispatch::{ChangeNotifier, Command, Dispatcher};
use fnoter::frontend::ConsoleFrontend;
use fnoter::logger;
use fnoter::protocol::Request;
use fnoter::server::{self, ServerInstance};
use fnoter::store::NoteStore;

#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("action").required(true)))]
struct Args {
    /// Create or edit the note attached to PATH
    #[arg(long, value_name = "PATH", group = "action")]
    add: Option<String>,

    /// Show the note attached to PATH
    #[arg(long, value_name = "PATH", group = "action")]
    view: Option<String>,

    /// Open the listing of every stored note
    #[arg(long, group = "action")]
    view_all: bool,
}

impl Args {
    fn request(&self) -> Request {
        if let Some(path) = &self.add {
            Request::add(path.clone())
        } else if let Some(path) = &self.view {
            Request::view(path.clone())
        } else {
            Request::view_all()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let request = args.request();

    logger::init();
    let app_config = config::load_config();

    // Both roles ensure the schema; a forwarding client may be the first
    // run ever.
    let store = NoteStore::open_at(&config::db_path())?;

    let addr = SocketAddr::from(([127, 0, 0, 1], app_config.server.port));
    if server::probe_and_send(addr, &request).await? {
        logger::log(&format!(
            "Main: forwarded {:?} to the instance on {addr}",
            request.action
        ));
        return Ok(());
    }

    let (instance, commands) = ServerInstance::bind(addr).await.with_context(|| {
        format!(
            "no running instance answered, but port {} could not be taken either; \
             a concurrent launch may have won it",
            app_config.server.port
        )
    })?;

    store.attach_notifier(ChangeNotifier::new(instance.commands()));

    let exit = instance.commands();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = exit.send(Command::Shutdown);
    });

    // The launching action is executed locally, never round-tripped
    // through the socket.
    let own = Command::from_request(request)?;
    let _ = instance.commands().send(own);

    Dispatcher::new(store, Box::new(ConsoleFrontend::new()), commands)
        .run()
        .await;

    instance.shutdown().await;
    logger::log("Main: exited cleanly");
    Ok(())
}
