#![cfg_attr(test, allow(unused_crate_dependencies))]

use std::io::{self, Write};

use anyhow::anyhow;

use self::replay::{Line, Replay};

mod args;
mod replay;
mod script;

fn main() -> anyhow::Result<()> {
    let args = self::args::parse();
    args.init_logging();

    tracing::info!("graphcache-replay {}", env!("CARGO_PKG_VERSION"));

    let config = args.config()?;
    let steps = script::load(&args.script)?;
    let mut replay = Replay::new(config);

    let mut stdout = io::stdout().lock();
    for (index, step) in steps.into_iter().enumerate() {
        let output = replay.step(step).map_err(|e| anyhow!("step {index} failed: {e}"))?;
        if output.is_empty() {
            continue;
        }

        serde_json::to_writer(&mut stdout, &Line { step: index, output: &output })?;
        writeln!(stdout)?;
    }

    let layers = replay.exchange().store().layer_owners();
    if !layers.is_empty() {
        tracing::warn!("operations still owning a layer after the replay: {layers:?}");
    }

    Ok(())
}
