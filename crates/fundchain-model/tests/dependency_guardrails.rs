// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

#[test]
fn model_crate_depends_only_on_core_and_data_crates() {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let cargo_toml =
        std::fs::read_to_string(manifest_dir.join("Cargo.toml")).expect("read Cargo.toml");
    for forbidden in [
        "fundchain-policies",
        "fundchain-chain",
        "fundchain-backend",
        "reqwest",
        "tokio",
        "tracing",
    ] {
        assert!(
            !cargo_toml.contains(forbidden),
            "fundchain-model must not depend on {forbidden}"
        );
    }
}
