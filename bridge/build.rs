use std::process::Command;

fn main() {
    set_git_version();
}

fn set_git_version() {
    let version = Command::new("git")
        .arg("describe")
        .arg("--always")
        .arg("--dirty=-modified")
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|version| version.trim().to_owned())
        .filter(|version| !version.is_empty())
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_owned());
    println!("cargo::rustc-env=VERSION={version}");
}
