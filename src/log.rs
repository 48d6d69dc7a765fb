use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes the crate's logger exactly once per process.
///
/// Safe to call from every test function; later calls are no-ops. Honors
/// `RUST_LOG`, defaulting to `info` when unset.
pub fn init_log() {
    INIT.call_once(|| {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{} - {}] [{}:{}] {}",
                    record.level(),
                    record.target(),
                    record.file().unwrap_or("?"),
                    record.line().unwrap_or(0),
                    record.args(),
                )
            })
            .is_test(true)
            .init();
    });
}
