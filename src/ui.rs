//! Terminal presentation for the command-line host.
//!
//! Results go to stdout as JSON; everything here writes to stderr so the
//! JSON stays machine-readable.

use console::style;
use indexmap::IndexMap;

use crate::config::BranchRule;
use crate::error::FlexVersionError;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    eprintln!("{} {}", style("→").yellow(), message);
}

/// Display the configured branch rules in matching order.
///
/// # Arguments
/// * `branches` - The branch rules, in configuration order
pub fn display_branch_rules(branches: &IndexMap<String, BranchRule>) {
    println!("{}", style("Configured branch rules:").bold());
    for (name, rule) in branches {
        let regex = if rule.regex.trim().is_empty() {
            style("(fallback)".to_string()).dim()
        } else {
            style(rule.regex.clone()).cyan()
        };
        let order: Vec<String> = rule
            .version_source
            .order
            .iter()
            .map(|kind| kind.to_string())
            .collect();
        println!(
            "  - {} {} [{}] outputs: {}",
            style(name).bold(),
            regex,
            order.join(", "),
            rule.output.len()
        );
    }
}

/// Describe an error for the user.
///
/// The terse form is the one-line cause chain; the detailed form
/// (diagnostic mode) is tagged with the error kind and uses the debug
/// representation, which spells out every cause.
pub fn describe_error(error: &anyhow::Error, diagnostic: bool) -> String {
    if !diagnostic {
        return format!("{:#}", error);
    }

    let kind = match error.downcast_ref::<FlexVersionError>() {
        Some(FlexVersionError::Config(_)) => "configuration",
        Some(FlexVersionError::VersionSourceNotFound { .. }) => "version-source",
        Some(FlexVersionError::Template { .. }) => "template",
        Some(FlexVersionError::NumericParse(_)) => "numeric",
        Some(FlexVersionError::Git(_)) => "git",
        Some(FlexVersionError::Io(_)) => "io",
        None => "other",
    };
    format!("[{}] {:?}", kind, error)
}
