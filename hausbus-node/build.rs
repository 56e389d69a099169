//! Build script for hausbus-node
//!
//! embassy-stm32 generates memory.x for the selected chip; this only adds
//! the linker scripts of cortex-m-rt and defmt.

fn main() {
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    println!("cargo:rerun-if-changed=build.rs");
}
