#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod cli;
mod controller;
mod core;
mod forecast;
mod prelude;
mod quantity;
mod tables;

use std::sync::{Arc, atomic::AtomicBool};

use clap::{Parser, crate_version};

use crate::{
    cli::{Args, Command},
    prelude::*,
};

fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().init();
    info!(version = crate_version!(), "starting…");

    let should_terminate = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&should_terminate))?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&should_terminate))?;

    match Args::parse().command {
        Command::Solve(args) => args.run()?,
        Command::Roll(args) => args.run(&should_terminate)?,
    }

    info!("done!");
    Ok(())
}
