use tickbridge_bridge::{DEFAULT_BUFFER_CAPACITY, DEFAULT_THROTTLE_THRESHOLD};
use tickbridge_wire::catalog;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("tickbridge {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: tickbridge");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("TICKBRIDGE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("event_kinds: {}", catalog::entries().len());
    println!("default_throttle: {DEFAULT_THROTTLE_THRESHOLD}");
    println!("default_buffer_capacity: {DEFAULT_BUFFER_CAPACITY}");

    Ok(SUCCESS)
}
