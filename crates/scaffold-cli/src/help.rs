use crate::result::CommandResult;
use colored::Colorize;
use scaffold_config::CONFIG_KEYS;
use serde_json::Value;

/// Show an overview when `scaffold` is invoked with no command
pub fn show_overview() {
    println!();
    println!("{}", "No command specified.".bold());
    println!();

    println!("{}", "Add to an existing plugin:".bold());
    for (command, description) in [
        ("add entity", "a TypeORM entity, optionally translatable"),
        ("add service", "a basic service or a CRUD service for an entity"),
        ("add job-queue", "a job queue inside a service"),
        ("add api-extension", "a GraphQL schema extension and resolver"),
        ("add ui-extension", "an Admin UI extension"),
        ("add dashboard", "a React dashboard extension"),
    ] {
        println!("  {:<22} {}", command.cyan(), description);
    }
    println!();

    println!("{}", "Create:".bold());
    println!("  {:<22} {}", "create plugin".cyan(), "a new plugin with its constants and types");
    println!();

    println!("{}", "Settings:".bold());
    println!(
        "  {:<22} {}",
        "config get|set|list|reset".cyan(),
        format!("keys: {}", CONFIG_KEYS.join(", ")).dimmed()
    );
    println!();

    println!("{}", "Usage:".bold());
    println!("  Run interactively inside a Vendure project:");
    println!("    scaffold add entity");
    println!();
    println!("  Run without prompts, e.g. in CI:");
    println!("    scaffold --non-interactive add entity --plugin reviews --name ProductReview");
    println!();
    println!("  Machine-readable output:");
    println!("    scaffold --json add service --plugin reviews --name ReviewService");
    println!();
}

/// Print a finished command for a human reader.
pub fn show_result(result: &CommandResult) {
    if !result.success {
        eprintln!("{} {}", "error:".red().bold(), result.message);
        if let Some(hint) = result.field_str("hint") {
            eprintln!("{} {}", "hint:".yellow(), hint);
        }
        return;
    }

    println!("{} {}", "✔".green(), result.message);
    if let Some(Value::Array(files)) = result.fields.get("files") {
        for file in files.iter().filter_map(Value::as_str) {
            println!("  {} {}", "wrote".dimmed(), file);
        }
    }
    if let Some(Value::Array(installed)) = result.fields.get("installed") {
        for package in installed.iter().filter_map(Value::as_str) {
            println!("  {} {}", "installed".dimmed(), package);
        }
    }
}
