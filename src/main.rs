fn main() -> anyhow::Result<()> {
    mindwave_lib::run()
}
