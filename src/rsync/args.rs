//! rsync argument vector construction, shared by both transports.

use crate::config::SyncOptions;
use crate::filter::ExclusionFilter;
use crate::scan::TopLevelEntry;
use std::path::Path;

/// What one rsync invocation transfers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The whole source tree (single-invocation sync)
    All,
    /// Only these top-level entries (one parallel chunk)
    Entries(Vec<TopLevelEntry>),
}

/// Inputs for one rsync command line
#[derive(Debug)]
pub struct RsyncArgs<'a> {
    pub options: &'a SyncOptions,
    pub filter: &'a ExclusionFilter,
    pub selection: &'a Selection,
    pub local_path: &'a Path,
    /// Value for `-e`
    pub remote_shell: String,
    /// `user@host:path/`
    pub destination: String,
}

impl RsyncArgs<'_> {
    pub fn build(&self) -> Vec<String> {
        let mut args = vec!["-az".to_string(), "--stats".to_string()];

        if self.options.delete {
            args.push("--delete".to_string());
        }
        if self.options.dry_run {
            args.push("-n".to_string());
        }
        if self.options.verbose {
            args.push("-v".to_string());
        }

        args.push("-e".to_string());
        args.push(self.remote_shell.clone());

        // rsync applies the first matching rule, so excludes must precede includes
        for pattern in self.filter.patterns() {
            args.push("--exclude".to_string());
            args.push(pattern.clone());
        }

        if let Selection::Entries(entries) = self.selection {
            for entry in entries {
                args.push("--include".to_string());
                args.push(include_pattern(entry));
            }
            args.push("--exclude".to_string());
            args.push("*".to_string());
        }

        args.push(source_arg(self.local_path));
        args.push(self.destination.clone());
        args
    }
}

const WILDCARDS: [char; 3] = ['*', '?', '['];

/// Include rule matching exactly one top-level entry.
///
/// rsync only honours backslash escapes in patterns that contain a wildcard,
/// so names are escaped whenever the rule ends up with one.
fn include_pattern(entry: &TopLevelEntry) -> String {
    let name = &entry.name;
    if !entry.is_dir && !name.contains(&WILDCARDS[..]) {
        return name.clone();
    }

    let mut escaped = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c == '\\' || WILDCARDS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    if entry.is_dir {
        escaped.push_str("/***");
    }
    escaped
}

/// Copy of `args` with `secret` masked in every spelling it is passed in
pub fn redact_args(args: &[String], secret: &str) -> Vec<String> {
    if secret.is_empty() {
        return args.to_vec();
    }
    let encoded: String = url::form_urlencoded::byte_serialize(secret.as_bytes()).collect();
    let ssh_escaped = encoded.replace('%', "%%");
    args.iter()
        .map(|arg| {
            arg.replace(&ssh_escaped, "***")
                .replace(&encoded, "***")
                .replace(secret, "***")
        })
        .collect()
}

/// Source path with a trailing slash so rsync copies the directory's contents
pub fn source_arg(local_path: &Path) -> String {
    let path = local_path.to_string_lossy();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("{}/", trimmed)
    }
}

/// `user@host:<remote_path>/`
pub fn remote_destination(user: &str, host: &str, remote_path: &str) -> String {
    let trimmed = remote_path.trim_end_matches('/');
    if trimmed.is_empty() {
        format!("{}@{}:/", user, host)
    } else {
        format!("{}@{}:{}/", user, host, trimmed)
    }
}
