fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "demos")]
    tonic_prost_build::compile_protos("demos/proto/docstore.proto")?;
    Ok(())
}
