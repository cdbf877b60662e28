use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mosaic::{Node, NodeConfig};
use tracing::{info, warn};

use crate::cmd::RunArgs;
use crate::exit::{config_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{OutputFormat, StdoutPublisher};

pub fn run(args: RunArgs, format: OutputFormat, mut config: NodeConfig) -> CliResult<i32> {
    args.apply(&mut config);
    let node = Node::new(config).map_err(config_error)?;

    let publisher = Arc::new(StdoutPublisher::new(format, node.config().frame_id.clone()));
    if node.subscribe(publisher).is_empty() {
        warn!("no message types enabled for publishing");
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    node.connect();
    let stats = node.run(&running);
    node.shutdown();

    info!(
        bytes = stats.bytes_read,
        valid = stats.frames_valid,
        invalid = stats.frames_invalid,
        published = stats.frames_dispatched,
        "stopped"
    );
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
