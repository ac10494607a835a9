use std::{
  path::PathBuf,
  process::ExitCode,
  time::Instant,
};

use clap::Parser;
use log::{error, info};
use scratch_runtime::{peripherals::Headless, Config, Project};

#[derive(Parser, Debug)]
#[command(name = "scratch-runtime", about = "Runs the scripts of a Scratch 3 project without a stage.")]
struct Args {
  #[arg(value_name = "PROJECT", help = "A .sb3 archive or a project.json file.")]
  project: PathBuf,

  #[arg(long, default_value_t = 30)]
  frame_rate: u32,

  #[arg(long, help = "Stop after this many frames even if scripts are still running.")]
  max_ticks: Option<u64>,

  #[arg(long, help = "Seed for pick random.")]
  seed: Option<u64>,

  #[arg(long = "answer", value_name = "TEXT", help = "Answers to ask prompts, in order.")]
  answers: Vec<String>,

  #[arg(long, help = "Do not sleep between frames.")]
  fast: bool,
}

fn main() -> ExitCode {
  pretty_env_logger::init();
  let args = Args::parse();
  let config = Config {
    frame_rate: args.frame_rate.max(1),
    seed: args.seed,
    ..Config::default()
  };
  let frame_time = config.frame_time();
  let peripherals = Headless::new().answers(args.answers).echo(true);
  let mut project = match Project::load(&args.project, config, peripherals) {
    Ok(project) => project,
    Err(err) => {
      error!("could not load {}: {err}", args.project.display());
      eprintln!("error: {err}");
      return ExitCode::FAILURE;
    }
  };
  project.restart_green_flag();
  let mut ticks: u64 = 0;
  loop {
    let started = Instant::now();
    let running = project.run_tick();
    ticks += 1;
    if !running {
      info!("all scripts finished after {ticks} frames");
      break;
    }
    if args.max_ticks.is_some_and(|max_ticks| ticks >= max_ticks) {
      info!("stopping after {ticks} frames");
      project.stop_all();
      break;
    }
    if !args.fast {
      std::thread::sleep(frame_time.saturating_sub(started.elapsed()));
    }
  }
  ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_args() {
    let args = Args::parse_from([
      "scratch-runtime",
      "game.sb3",
      "--seed",
      "7",
      "--answer",
      "yes",
      "--answer",
      "no",
      "--fast",
    ]);
    assert_eq!(args.project, PathBuf::from("game.sb3"));
    assert_eq!(args.frame_rate, 30);
    assert_eq!(args.seed, Some(7));
    assert_eq!(args.answers, ["yes", "no"]);
    assert!(args.fast);
  }
}
