//! Compiles the meshgate wire schema with tonic-build.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile(&["proto/meshgate.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/meshgate.proto");
    Ok(())
}
