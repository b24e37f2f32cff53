// crates/meeple-rpc/src/lib.rs
//
// meeple-rpc: JSON-RPC-over-gRPC server and handlers for the Meeple
// recommender.
//
// The request boundary: loosely-typed JSON params are parsed into strongly
// typed request structs and validated here, before anything reaches the
// scoring engine.

pub mod handlers;
pub mod middleware;
pub mod server;

// Re-export the main server type for ergonomic access.
pub use server::MeepleRpcServer;
pub use server::RpcConfig;
