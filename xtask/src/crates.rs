use std::process::Command;

use anyhow::{Context, Result};

/// Workspace members checked one at a time, so a crate that only compiles
/// thanks to feature unification with its siblings is caught.
const MEMBERS: &[&str] =
    &["focusledger-domain", "focusledger-core", "focusledger-infra", "focusledger-agent"];

pub fn check_each_crate() -> Result<()> {
    println!("Checking {} crates in isolation...", MEMBERS.len());

    for (index, member) in MEMBERS.iter().enumerate() {
        println!("\n[{}/{}] cargo check -p {member} --all-targets", index + 1, MEMBERS.len());

        let status = Command::new("cargo")
            .args(["check", "-p", member, "--all-targets"])
            .status()
            .with_context(|| format!("Failed to run cargo check for '{member}'"))?;

        if !status.success() {
            anyhow::bail!("Crate '{member}' failed to compile on its own");
        }

        println!("✅ {member} compiled");
    }

    println!("\n✅ All {} crates compile in isolation", MEMBERS.len());
    Ok(())
}
