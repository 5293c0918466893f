use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    let out = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::copy("memory.x", out.join("memory.x")).unwrap();
    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rerun-if-changed=memory.x");

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    println!("cargo:rustc-link-arg-tests=--nmagic");
    println!("cargo:rustc-link-arg-tests=-Tlink.x");
    println!("cargo:rustc-link-arg-tests=-Tdefmt.x");

    // The crash log compares the first 19 bytes, the timestamp fills them exactly
    println!("cargo:rerun-if-env-changed=OTAGUARD_BUILD_INFO");
    if env::var("OTAGUARD_BUILD_INFO").is_err() {
        let build_info = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S");
        println!("cargo:rustc-env=OTAGUARD_BUILD_INFO={build_info}");
    }
}
