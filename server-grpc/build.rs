use std::error::Error;
use std::{env, path::PathBuf};
use tonic_prost_build::configure;

fn main() -> Result<(), Box<dyn Error>> {
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);

    let mut config = prost_build::Config::new();
    if env::var_os("PROTOC").is_none() {
        config.protoc_executable(protoc_bin_vendored::protoc_bin_path()?);
    }

    configure()
        .file_descriptor_set_path(out_dir.join("cart_descriptor.bin"))
        .compile_with_config(config, &["proto/cart.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/cart.proto");
    Ok(())
}
