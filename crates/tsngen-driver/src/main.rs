use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the scenario settings file (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Override the settings file's seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Override the settings file's output directory
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut config = tsngen_driver::load_config(&args.config)?;
    if let Some(seed) = args.seed {
        config.scenario.seed = seed;
    }
    if let Some(output) = args.output {
        config.output_dir = output;
    }
    let out = tsngen_driver::run(config)?;
    let network = out.scenario.network();
    println!(
        "generated {} switches, {} end systems, {} links, {} streams",
        network.nr_switches(),
        network.nr_end_systems(),
        network.nr_links(),
        out.scenario.streams().len(),
    );
    if let Some(artifacts) = &out.artifacts {
        println!("wrote {}", artifacts.ned.display());
        println!("wrote {}", artifacts.ini.display());
    }
    Ok(())
}
