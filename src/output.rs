//! Unified terminal output helpers.
//!
//! Every command prints through these so icon usage and indentation stay
//! consistent:
//!
//! - `✓` success / healthy
//! - `✗` error / failure (stderr)
//! - `⚠` warning
//! - `○` skipped / not applicable
//! - `-` not found / missing
//! - `~` neutral info / state change

use console::style;

/// Prints a top-level section header, e.g. `=== Link ===`.
pub fn section(title: &str) {
   println!("\n=== {} ===", style(title).bold());
}

/// Prints a grouped-section bullet, e.g. `● Already linked:`.
pub fn bullet(title: &str) {
   println!("\n● {title}");
}

pub fn ok(name: &str, msg: &str) {
   println!("  {}  {}", style("✓").green(), labeled(name, msg));
}

pub fn err(name: &str, msg: &str) {
   eprintln!("  {}  {}", style("✗").red(), labeled(name, msg));
}

pub fn warn(name: &str, msg: &str) {
   println!("  {}  {}", style("⚠").yellow(), labeled(name, msg));
}

pub fn skip(name: &str, msg: &str) {
   println!("  {}  {}", style("○").dim(), labeled(name, msg));
}

pub fn miss(name: &str, msg: &str) {
   println!("  -  {}", labeled(name, msg));
}

pub fn info(name: &str, msg: &str) {
   println!("  ~  {}", labeled(name, msg));
}

fn labeled(name: &str, msg: &str) -> String {
   if name.is_empty() {
      msg.to_string()
   } else if msg.is_empty() {
      format!("[{name}]")
   } else {
      format!("[{name}] {msg}")
   }
}
