use clap::Parser;
use kryptodekl::cmd::Cli;

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    Cli::parse().exec()
}
