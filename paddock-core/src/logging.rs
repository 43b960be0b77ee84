use env_logger::{Builder, Env};
use std::io::Write;

/// Installs the process-wide logger.
///
/// Defaults to `paddock_core=info`; `RUST_LOG` overrides it. Safe to call
/// more than once, later calls are ignored.
pub fn init_logger() {
    let mut builder =
        Builder::from_env(Env::default().default_filter_or("paddock_core=info"));

    builder.format(|buf, record| {
        let module_path = record.module_path().unwrap_or("<unknown>");
        writeln!(
            buf,
            "[{}][{}] {}",
            record.level(),
            module_path,
            record.args()
        )
    });

    let _ = builder.try_init();
}
