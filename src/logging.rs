//! tracing 구독자 초기화. 바이너리 시작 시 한 번만 호출한다.

use tracing_subscriber::EnvFilter;

/// RUST_LOG가 없으면 warn 수준으로 stderr에 출력한다.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
