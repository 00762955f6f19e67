use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    let version = env!("CARGO_PKG_VERSION");
    println!("h2fuzz {version}");

    if args.extended {
        println!("name: {}", env!("CARGO_PKG_NAME"));
        println!(
            "target: {}",
            option_env!("H2FUZZ_BUILD_TARGET").unwrap_or("unknown")
        );
        println!("os: {}", std::env::consts::OS);
        println!("arch: {}", std::env::consts::ARCH);
        println!(
            "profile: {}",
            option_env!("H2FUZZ_BUILD_PROFILE").unwrap_or("unknown")
        );
        println!("features: {}", enabled_features().join(","));
    }

    Ok(SUCCESS)
}

fn enabled_features() -> Vec<&'static str> {
    let mut features = Vec::new();
    if cfg!(feature = "cli") {
        features.push("cli");
    }
    features
}
