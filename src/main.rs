fn main() {
    #[cfg(feature = "cli")]
    xdelta::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("xdelta: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
