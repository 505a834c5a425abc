use std::fs;
use std::path::Path;

#[test]
fn lib_root_exports_the_bot_modules() {
    let lib_rs = Path::new(env!("CARGO_MANIFEST_DIR")).join("src/lib.rs");
    let source = fs::read_to_string(&lib_rs).expect("read src/lib.rs");

    for module in [
        "app", "channels", "config", "dispatch", "notify", "orders", "payments", "session",
        "shared", "wizard",
    ] {
        assert!(
            source.contains(&format!("pub mod {module};")),
            "src/lib.rs should export `{module}`"
        );
    }
    assert!(
        !source.contains("pub mod cli;"),
        "the binary routes through app::cli rather than a root cli module"
    );
}

#[test]
fn binary_delegates_to_app_cli() {
    let bin = Path::new(env!("CARGO_MANIFEST_DIR")).join("src/bin/haulbot.rs");
    let source = fs::read_to_string(&bin).expect("read src/bin/haulbot.rs");
    assert!(source.contains("haulbot::app::run_cli"));
}
