use env_logger::{Builder, Env};
use std::io::Write;

/// `GPLAY_LOG_LEVEL` overrides the level picked from `--verbose`.
pub fn init_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let env = Env::default()
        .filter_or("GPLAY_LOG_LEVEL", level)
        .write_style_or("GPLAY_LOG_STYLE", "auto");

    Builder::from_env(env)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                buf.timestamp(),
                record.level(),
                record.args()
            )
        })
        .init();
}
