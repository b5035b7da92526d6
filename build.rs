fn main() {
    let output = std::process::Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok();

    let hash = output
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let pkg_version = env!("CARGO_PKG_VERSION");
    let version = if hash.is_empty() {
        pkg_version.to_string()
    } else {
        format!("{pkg_version} ({hash})")
    };

    println!("cargo::rustc-env=ORC_METADATA_VERSION={version}");
    println!("cargo::rerun-if-changed=.git/HEAD");
}
