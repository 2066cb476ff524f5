//! Command-line style argument parsing for tools.

use std::collections::{BTreeSet, HashMap};

/// Parsed tool arguments.
///
/// Short flags may be bundled (`-la`). Options listed as taking a value accept
/// either `-n 5` or `-n5`; long options use `--name=value`. `--` ends option
/// parsing and a lone `-` is positional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolArgs {
    pub positional: Vec<String>,
    pub flags: BTreeSet<String>,
    pub options: HashMap<String, String>,
}

impl ToolArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `argv` (without the program name).
    pub fn parse(argv: &[String], value_options: &[&str]) -> Result<Self, String> {
        let mut args = Self::new();
        let mut iter = argv.iter();
        while let Some(arg) = iter.next() {
            if arg == "--" {
                args.positional.extend(iter.cloned());
                break;
            }
            if let Some(long) = arg.strip_prefix("--") {
                match long.split_once('=') {
                    Some((key, value)) => {
                        args.options.insert(key.to_string(), value.to_string());
                    }
                    None if value_options.contains(&long) => {
                        let value = iter
                            .next()
                            .ok_or_else(|| format!("option --{long} requires a value"))?;
                        args.options.insert(long.to_string(), value.clone());
                    }
                    None => {
                        args.flags.insert(long.to_string());
                    }
                }
                continue;
            }
            let Some(short) = arg.strip_prefix('-').filter(|s| !s.is_empty()) else {
                args.positional.push(arg.clone());
                continue;
            };
            for (i, c) in short.char_indices() {
                let name = c.to_string();
                if value_options.contains(&name.as_str()) {
                    let rest = &short[i + c.len_utf8()..];
                    let value = if rest.is_empty() {
                        iter.next()
                            .cloned()
                            .ok_or_else(|| format!("option -{c} requires a value"))?
                    } else {
                        rest.to_string()
                    };
                    args.options.insert(name, value);
                    break;
                }
                args.flags.insert(name);
            }
        }
        Ok(args)
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.contains(name)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.positional.get(index).map(String::as_str)
    }

    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    /// A numeric option, `Ok(None)` when absent.
    pub fn option_usize(&self, name: &str) -> Result<Option<usize>, String> {
        match self.option(name) {
            None => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| format!("invalid number for -{name}: {raw}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_bundled_flags() {
        let args = ToolArgs::parse(&argv(&["-la", "/tmp"]), &[]).unwrap();
        assert!(args.has_flag("l"));
        assert!(args.has_flag("a"));
        assert_eq!(args.positional, vec!["/tmp"]);
    }

    #[test]
    fn test_value_options() {
        let args = ToolArgs::parse(&argv(&["-n", "2", "f"]), &["n"]).unwrap();
        assert_eq!(args.option_usize("n").unwrap(), Some(2));
        assert_eq!(args.get(0), Some("f"));

        let attached = ToolArgs::parse(&argv(&["-n5"]), &["n"]).unwrap();
        assert_eq!(attached.option("n"), Some("5"));
    }

    #[test]
    fn test_missing_value_is_error() {
        let err = ToolArgs::parse(&argv(&["-n"]), &["n"]).unwrap_err();
        assert!(err.contains("requires a value"));
    }

    #[test]
    fn test_double_dash_and_lone_dash() {
        let args = ToolArgs::parse(&argv(&["-", "--", "-v"]), &[]).unwrap();
        assert_eq!(args.positional, vec!["-", "-v"]);
        assert!(args.flags.is_empty());
    }

    #[test]
    fn test_long_options() {
        let args = ToolArgs::parse(&argv(&["--json", "--scope=/data"]), &[]).unwrap();
        assert!(args.has_flag("json"));
        assert_eq!(args.option("scope"), Some("/data"));
    }

    #[test]
    fn test_bad_number() {
        let args = ToolArgs::parse(&argv(&["-n", "x"]), &["n"]).unwrap();
        assert!(args.option_usize("n").is_err());
    }
}
