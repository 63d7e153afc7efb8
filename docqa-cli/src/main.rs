fn main() -> anyhow::Result<()> {
    docqa_cli::run()
}
