fn main() -> anyhow::Result<()> {
    scanreveal_lib::run()
}
