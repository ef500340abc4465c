//! Headless demo entry point. All the work happens in the library's
//! [`voxel_generation::run`]; see the crate docs for driving the engine from
//! a host renderer instead.
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- [config.json]
//! ```

fn main() {
    voxel_generation::run();
}
