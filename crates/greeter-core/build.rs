/// Generates the gRPC client and server stubs for the `greeter.Greeter` service.
///
/// The message types are declared by hand with `prost` derives in
/// `src/proto.rs`, so the service is described here with `tonic-build`'s manual
/// builder and no `protoc` invocation is needed. Every method uses the
/// `tonic-prost` codec.
///
/// # Output
///
/// The generated file lands in `OUT_DIR` as `greeter.Greeter.rs` and is pulled
/// in by [`proto`](src/proto.rs):
///
/// ```rust,ignore
/// include!(concat!(env!("OUT_DIR"), "/greeter.Greeter.rs"));
/// ```
///
/// It contains the `greeter_client` and `greeter_server` modules.
use tonic_build::manual::{Builder, Method, Service};

const CODEC: &str = "tonic_prost::ProstCodec";

fn method(name: &str, route: &str, input: &str, output: &str) -> tonic_build::manual::MethodBuilder {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(format!("crate::proto::{input}"))
        .output_type(format!("crate::proto::{output}"))
        .codec_path(CODEC)
}

fn main() {
    let greeter = Service::builder()
        .name("Greeter")
        .package("greeter")
        .method(method("say_hello_un", "SayHelloUN", "HelloRequest", "HelloResponse").build())
        .method(
            method("say_hello_ss", "SayHelloSS", "HelloRequest", "HelloResponse")
                .server_streaming()
                .build(),
        )
        .method(
            method("say_hello_cs", "SayHelloCS", "HelloRequest", "HelloResponse")
                .client_streaming()
                .build(),
        )
        .method(
            method("say_hello_bi", "SayHelloBI", "HelloRequest", "StreamingHelloResponse")
                .client_streaming()
                .server_streaming()
                .build(),
        )
        .build();

    Builder::new().compile(&[greeter]);
}
