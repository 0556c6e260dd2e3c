use std::time::Instant;

use log::info;

use tsp_bf_core::{Result, SearchOptions, logging, runner};

fn main() -> Result<()> {
    let now = Instant::now();
    let options = SearchOptions::from_args()?;
    logging::init_logger(&options)?;

    info!("options: {options}");

    runner::run(&options)?;

    info!("done: time={:.2}s", now.elapsed().as_secs_f32());

    Ok(())
}
