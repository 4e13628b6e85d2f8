#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::{Command, Output};

use tickbridge::wire::{EventKind, Packer};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "tickbridge-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn tickbridge(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tickbridge"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .env_remove("TICKBRIDGE_MODE")
        .env_remove("TICKBRIDGE_THROTTLE")
        .output()
        .expect("tickbridge should run")
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
        panic!(
            "stdout should be JSON ({err}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

#[test]
fn version_prints_package_version() {
    let out = tickbridge(&["version"]);
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8_lossy(&out.stdout).trim(),
        format!("tickbridge {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn catalog_lists_kinds_with_sizes() {
    let out = tickbridge(&["--format", "json", "catalog"]);
    assert!(out.status.success());
    let rows = json(&out);
    let rows = rows.as_array().expect("catalog should be an array");

    let sprite_add = rows.iter().find(|r| r["name"] == "SPRITE_ADD").expect("SPRITE_ADD row");
    assert_eq!(sprite_add["id"], 0);
    assert_eq!(sprite_add["fixed_size"], 128);
    assert_eq!(sprite_add["layout"], "fixed");

    let audio_load = rows.iter().find(|r| r["name"] == "AUDIO_LOAD").expect("AUDIO_LOAD row");
    assert_eq!(audio_load["legacy_padding"], true);
    assert_eq!(audio_load["layout"], "strings");
}

#[test]
fn catalog_filters_by_category() {
    let out = tickbridge(&["--format", "json", "catalog", "--category", "camera"]);
    assert!(out.status.success());
    let rows = json(&out);
    let rows = rows.as_array().expect("catalog should be an array");
    assert_eq!(rows.len(), 6);
    assert!(rows.iter().all(|r| r["category"] == "camera"));

    let out = tickbridge(&["catalog", "--category", "nope"]);
    assert_eq!(out.status.code(), Some(64));
}

#[test]
fn simulate_direct_dump_round_trips_through_inspect() {
    let dir = unique_temp_dir("simulate");
    let dump = dir.join("last.bin");

    let out = tickbridge(&[
        "--format",
        "json",
        "simulate",
        "--mode",
        "direct",
        "--frames",
        "5",
        "--dump",
        dump.to_str().expect("utf-8 temp path"),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let report = json(&out);
    assert_eq!(report["mode"], "direct");
    assert_eq!(report["frames_submitted"], 5);
    assert_eq!(report["outputs_received"], 5);
    assert_eq!(report["stats"]["worker_failures"], 0);
    assert_eq!(report["interrupted"], false);

    let out = tickbridge(&["--format", "json", "inspect", dump.to_str().unwrap()]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let frame = json(&out);
    let channels = frame["channels"].as_array().expect("channels array");
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0]["name"], "RENDERER");
    assert_eq!(channels[0]["records"][0]["name"], "SPRITE_MOVE");
    assert_eq!(channels[0]["records"][0]["offset"], 8);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn simulate_pipelined_respects_throttle() {
    let out = tickbridge(&[
        "--format",
        "json",
        "simulate",
        "--frames",
        "40",
        "--throttle",
        "2",
        "--worker-delay-ms",
        "2",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let report = json(&out);
    assert_eq!(report["mode"], "pipelined");
    assert_eq!(report["frames_submitted"], 40);
    assert_eq!(report["frames_submitted"], report["stats"]["frames_submitted"]);
    assert!(report["stats"]["max_pending_at_submit"].as_u64().unwrap() <= 3);
    assert!(report["outputs_received"].as_u64().unwrap() >= 1);
}

#[test]
fn simulate_rejects_zero_throttle() {
    let out = tickbridge(&["simulate", "--throttle", "0", "--frames", "1"]);
    assert_eq!(out.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&out.stderr).contains("throttle_threshold"));
}

#[test]
fn inspect_reports_truncated_channel_blob() {
    let dir = unique_temp_dir("inspect");
    let path = dir.join("blob.bin");

    let mut packer = Packer::with_capacity(1024);
    packer.pack_fixed(EventKind::InputKeyDown, &[7u8; 12]).unwrap();
    packer.pack_fixed(EventKind::SpriteAdd, &[0u8; 128]).unwrap();
    let blob = packer.finalize();
    std::fs::write(&path, &blob[..blob.len() - 40]).unwrap();

    let out = tickbridge(&["--format", "json", "inspect", "--channel-blob", path.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(60));
    let report = json(&out);
    let channel = &report["channels"][0];
    assert_eq!(channel["declared_records"], 2);
    assert_eq!(channel["records"].as_array().unwrap().len(), 1);
    assert_eq!(channel["records"][0]["name"], "INPUT_KEYDOWN");
    assert!(channel["error"].as_str().unwrap().contains("out of bounds"));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn inspect_rejects_malformed_frame() {
    let dir = unique_temp_dir("malformed");
    let path = dir.join("frame.bin");
    // Claims one channel of 64 bytes but carries none.
    let mut frame = Vec::new();
    frame.extend_from_slice(&1u32.to_le_bytes());
    frame.extend_from_slice(&0u32.to_le_bytes());
    frame.extend_from_slice(&0u32.to_le_bytes());
    frame.extend_from_slice(&64u32.to_le_bytes());
    std::fs::write(&path, &frame).unwrap();

    let out = tickbridge(&["inspect", path.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&out.stderr).contains("malformed frame"));

    let _ = std::fs::remove_dir_all(dir);
}
