fn git(args: &[&str]) -> Option<String> {
    std::process::Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");

    // Tagged builds report the crate version; everything else reports the
    // commit the binary was built from.
    let on_tag = git(&["describe", "--exact-match", "--tags", "HEAD"]).is_some();
    let version = if on_tag {
        std::env::var("CARGO_PKG_VERSION").unwrap_or_default()
    } else {
        match git(&["rev-parse", "--short", "HEAD"]) {
            Some(hash) if !hash.is_empty() => format!("dev@{hash}"),
            _ => "dev@unknown".to_string(),
        }
    };

    println!("cargo:rustc-env=BUILD_VERSION={version}");
}
