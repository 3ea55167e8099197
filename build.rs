use std::error::Error;
use vergen::EmitBuilder;

fn main() -> Result<(), Box<dyn Error>> {
    // VERGEN_GIT_DESCRIBE feeds the full version string in cli.rs
    // outside of a git checkout, vergen falls back to placeholder values instead of failing
    EmitBuilder::builder()
        .all_git()
        .git_describe(true, false, Some("ThisPatternShouldNotMatchAnythingEver"))
        .emit()?;

    // track the toml and src folder so a dirty tree is caught
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-changed=src");

    Ok(())
}
