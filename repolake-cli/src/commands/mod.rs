pub mod extract;
pub mod query;

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search a saved graph document or show a node's connections
    Query(query::QueryArgs),
}

pub fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Query(args) => query::run(&args),
    }
}
