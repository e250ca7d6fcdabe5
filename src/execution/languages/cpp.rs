//! C++ language toolchain

use super::Toolchain;

pub fn toolchain() -> Toolchain {
    Toolchain::new(
        "main.cpp",
        Some(&["g++", "-O2", "-std=c++17", "-o", "{bin}", "{src}"]),
        &["{bin}"],
    )
}
