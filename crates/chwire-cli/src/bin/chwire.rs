use anyhow::Result;

fn main() -> Result<()> {
    chwire_cli::cli::run()
}
