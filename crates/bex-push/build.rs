//! Build script for bex-push.
//!
//! Compiles the Block Exchange Protocol definitions to Rust code.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only compile protos if the codegen feature is enabled
    #[cfg(feature = "codegen")]
    {
        let proto_root = std::path::Path::new("../../proto");
        let proto_file = proto_root.join("bex/v1/bep.proto");

        println!("cargo:rerun-if-changed={}", proto_file.display());

        prost_build::Config::new()
            .out_dir("src/")
            .compile_protos(&[proto_file], &[proto_root])?;

        // Rename the generated file to proto.rs
        let generated = std::path::Path::new("src/bex.v1.rs");
        if generated.exists() {
            std::fs::rename(generated, "src/proto.rs")?;
        }
    }

    Ok(())
}
