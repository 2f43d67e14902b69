use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR")?);
    let proto_root = manifest_dir.join("../../proto");

    tonic_build::configure().compile_protos(&[proto_root.join("service.proto")], &[&proto_root])?;

    println!(
        "cargo:rerun-if-changed={}",
        proto_root.join("service.proto").display()
    );
    Ok(())
}
