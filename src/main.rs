fn main() -> anyhow::Result<()> {
    switchyard::cli::run_cli()
}
