//! Python language toolchain

use super::Toolchain;

pub fn toolchain() -> Toolchain {
    Toolchain::new("main.py", None, &["python3", "{src}"])
}
