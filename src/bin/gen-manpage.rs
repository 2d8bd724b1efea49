//! Man page generator for owmem
//!
//! Writes `owmem.1` plus one `owmem-<command>.1` page per subcommand.
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::{Command, CommandFactory};
use std::fs;
use std::path::{Path, PathBuf};

#[path = "../cli.rs"]
mod cli;

fn render(cmd: Command, dir: &Path, file: &str) -> std::io::Result<PathBuf> {
    let mut buffer = Vec::new();
    clap_mangen::Man::new(cmd).render(&mut buffer)?;
    let path = dir.join(file);
    fs::write(&path, buffer)?;
    Ok(path)
}

fn main() -> std::io::Result<()> {
    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    fs::create_dir_all(&output_dir)?;

    let cmd = cli::Cli::command();
    let main_page = render(cmd.clone(), &output_dir, "owmem.1")?;
    println!("{}", main_page.display());

    for sub in cmd.get_subcommands() {
        let name = format!("owmem-{}", sub.get_name());
        let page = sub.clone().display_name(name.clone());
        let path = render(page, &output_dir, &format!("{}.1", name))?;
        println!("{}", path.display());
    }

    println!("\nView with: man -l {}", main_page.display());
    Ok(())
}
