fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The Locket stubs in src/grpc/latchkey.rs are checked in so that building
    // does not require protoc. After editing proto/latchkey.proto, regenerate with:
    //
    // tonic_prost_build::configure()
    //     .build_server(true)
    //     .build_client(true)
    //     .out_dir("src/grpc/")
    //     .compile_protos(&["proto/latchkey.proto"], &["proto/"])?;

    println!("cargo:rerun-if-changed=proto/");

    Ok(())
}
