fn main() -> anyhow::Result<()> {
    notekeeper::cli::run()
}
