use clap::CommandFactory;
use clap_complete::Shell;
use linguapace_core::error::Result;

use crate::Cli;

pub fn run(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "linguapace", &mut std::io::stdout());
    Ok(())
}
