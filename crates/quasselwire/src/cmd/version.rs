use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("quasselwire {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: quasselwire");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("protocol_version: {}", quasselwire_session::PROTOCOL_VERSION);
    println!(
        "build_target: {}",
        option_env!("QUASSELWIRE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("features: session={}, cli=true", cfg!(feature = "session"));

    Ok(SUCCESS)
}
