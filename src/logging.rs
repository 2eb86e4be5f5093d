/// Route `log` records to logcat on Android and stderr elsewhere
pub fn init_logging(level: log::LevelFilter) {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(level)
                .with_tag("galagy"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        // RUST_LOG still wins over the default level
        let _ = env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .try_init();
    }
}
