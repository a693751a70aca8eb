use clap::Parser;
use radcalnet_processor::cli::{block_on, run, Cli};
use radcalnet_processor::error::Result;

fn main() -> Result<()> {
    let cli = Cli::parse();
    block_on(run(cli))?
}
