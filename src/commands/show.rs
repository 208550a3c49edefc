//! Show command - displays information.

use anyhow::Result;

use crate::config::Config;
use crate::ldconfig::LdconfigCache;
use crate::locate::default_lib_dirs;

/// Show target for the show command.
pub enum ShowTarget {
    /// Show configuration and the library search context
    Config,
}

/// Execute the show command.
pub fn cmd_show(target: ShowTarget, config: &Config) -> Result<()> {
    match target {
        ShowTarget::Config => {
            config.print();
            println!();
            print_search_context(config);
        }
    }
    Ok(())
}

fn print_search_context(config: &Config) {
    println!("Library search context:");
    for dir in &config.ld_library_path {
        println!("  LD_LIBRARY_PATH entry: {}", dir.display());
    }
    let cache = LdconfigCache::query(config);
    println!("  ldconfig cache: {} names", cache.len());
    for dir in default_lib_dirs() {
        println!("  default dir: {}", dir.display());
    }
}
