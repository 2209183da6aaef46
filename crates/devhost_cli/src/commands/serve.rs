//! Serve command implementation.

use devhost_mirror::{MirrorClient, MirrorConfig, MirrorWorker, UreqClient};
use devhost_server::{DevServer, HandlerContext, ServerConfig};
use devhost_store::CommitObserver;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

/// Runs the server until the process is stopped.
pub fn run(root: &Path, addr: SocketAddr, mirror: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::new(root).with_bind_addr(addr);

    let observers: Vec<Arc<dyn CommitObserver>> = if mirror {
        mirror_observer(MirrorConfig::from_env()).into_iter().collect()
    } else {
        tracing::info!("mirroring disabled by --no-mirror");
        Vec::new()
    };

    let server = DevServer::with_context(HandlerContext::with_observers(config, observers))?;
    println!("Serving {} at http://{}", root.display(), server.local_addr());
    server.run();
    Ok(())
}

/// Starts the mirror worker for a resolved configuration.
///
/// Mirroring is optional: a missing or invalid configuration, or a worker
/// that fails to start, is logged and the server runs without it.
fn mirror_observer(
    config: devhost_mirror::MirrorResult<Option<MirrorConfig>>,
) -> Option<Arc<dyn CommitObserver>> {
    let config = match config {
        Ok(Some(config)) => config,
        Ok(None) => {
            tracing::info!("mirroring disabled: GITHUB_TOKEN or GITHUB_REPO not set");
            return None;
        }
        Err(err) => {
            tracing::warn!(error = %err, "invalid mirror configuration, mirroring disabled");
            return None;
        }
    };

    let transport = UreqClient::new(config.timeout);
    match MirrorWorker::spawn(MirrorClient::new(config, transport)) {
        Ok(worker) => {
            let worker: Arc<dyn CommitObserver> = Arc::new(worker);
            Some(worker)
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to start mirror worker, mirroring disabled");
            None
        }
    }
}
