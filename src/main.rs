//! # CEP analysis CLI
//!
//! Run the analysis tasks over a JSON-lines event file.
//!
//! ```bash
//! # CEP trigger study on ESD events
//! cep-analysis --input events.jsonl --task mc-info --output mc_info.json
//!
//! # Both tasks with a custom configuration
//! cep-analysis --input events.jsonl --config analysis.json
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use cep_analysis::{AnalysisConfig, AnalysisManager, CepResult, EventReader, McInfoTask, MyTask};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TaskChoice {
    /// Kinematic histograms and trees from AOD events
    MyTask,
    /// CEP selection and MC-truth comparison on ESD events
    McInfo,
    /// Both tasks
    All,
}

/// CEP trigger analysis
#[derive(Parser, Debug)]
#[command(name = "cep-analysis")]
#[command(about = "Run CEP analysis tasks over a JSON-lines event file")]
struct Args {
    /// Input events, one JSON object per line
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Tasks to run
    #[arg(long, short = 't', value_enum, default_value = "all")]
    task: TaskChoice,

    /// JSON configuration file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Use the run-1 track-type definition
    #[arg(long)]
    run1: bool,

    /// Output file
    #[arg(long, short = 'o', default_value = "analysis_output.json")]
    output: PathBuf,
}

fn run(args: Args) -> CepResult<()> {
    let config = AnalysisConfig::resolve(args.config.as_deref(), args.run1)?;

    let mut manager = AnalysisManager::new();
    if matches!(args.task, TaskChoice::MyTask | TaskChoice::All) {
        manager.add_task(Box::new(MyTask::new("my_task", config.my_task.clone())))?;
    }
    if matches!(args.task, TaskChoice::McInfo | TaskChoice::All) {
        manager.add_task(Box::new(McInfoTask::new("mc_info", config.mc_info.clone())))?;
    }

    manager.init_analysis()?;
    let stats = manager.start_analysis(EventReader::open(&args.input)?)?;
    manager.terminate()?;
    manager.write_outputs(&args.output)?;

    println!(
        "Processed {} events ({} ESD, {} AOD) -> {}",
        stats.events,
        stats.esd_events,
        stats.aod_events,
        args.output.display()
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("cep-analysis {}", cep_analysis::VERSION);

    if let Err(e) = run(args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
