use std::{env, fs, path::PathBuf};

/// Desk controller tunables, overridable from the environment or a `.env` file.
const DESK_SETTINGS: [(&str, &str); 4] = [
    ("DESK_HEIGHT_READ_INTERVAL_MS", "50"),
    ("DESK_CONTROL_LOOP_MS", "100"),
    ("DESK_INITIAL_NUDGE_MS", "500"),
    ("DESK_TARGET_TOLERANCE_CM", "0"),
];

fn main() {
    // 1) Handle memory.x based on target
    let target = env::var("TARGET").unwrap_or_default();
    if target.starts_with("thumbv8m") {
        // Pico 2 ARM
        copy_memory_x("memory-pico2.x");
    } else if target.starts_with("thumbv6m") {
        // Pico 1
        copy_memory_x("memory.x");
    }

    // 2) Load optional env files
    let _ = dotenvy::from_filename(".env");
    load_home_env(".pico.env");
    load_home_env(".env");

    // 3) Expose the desk settings as compile-time constants
    for (key, default) in DESK_SETTINGS {
        let value = env_or_default(key, default);
        if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
            println!("cargo:warning={key}={value:?} is not a whole number; using {default}");
            println!("cargo:rustc-env={key}={default}");
        } else {
            println!("cargo:rustc-env={key}={value}");
        }
        println!("cargo:rerun-if-env-changed={key}");
    }
    println!("cargo:rerun-if-changed=.env");
}

fn copy_memory_x(source: &str) {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let memory_x =
        fs::read_to_string(source).unwrap_or_else(|err| panic!("Failed to read {source}: {err}"));
    fs::write(out_dir.join("memory.x"), memory_x).expect("Failed to write memory.x");
    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rerun-if-changed={source}");
}

fn load_home_env(file: &str) {
    let home = match env::var_os("USERPROFILE").or_else(|| env::var_os("HOME")) {
        Some(path) => PathBuf::from(path),
        None => return,
    };
    let _ = dotenvy::from_path(home.join(file));
}

fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}
