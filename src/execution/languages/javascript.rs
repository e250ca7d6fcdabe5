//! JavaScript (Node.js) toolchain

use super::Toolchain;

pub fn toolchain() -> Toolchain {
    Toolchain::new("main.js", None, &["node", "{src}"])
}
