use std::path::Path;

use dialoguer::Completion;

/// Every word the REPL prompt understands
pub const COMMANDS: &[&str] = &[
    "create", "c", "list", "l", "delete", "d", "ssh", "s", "auth", "help", "?", "exit", "quit",
];

/// Longest common prefix of the candidates, if it extends `input`
fn complete_from<'a>(input: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut matches = candidates.into_iter().filter(|c| c.starts_with(input));
    let first = matches.next()?;
    let mut prefix = first.to_string();
    for candidate in matches {
        let common: usize = prefix
            .chars()
            .zip(candidate.chars())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a.len_utf8())
            .sum();
        prefix.truncate(common);
    }
    (prefix.len() > input.len()).then_some(prefix)
}

/// Completes command names at the main prompt
#[derive(Debug, Default)]
pub struct CommandCompletion;

impl Completion for CommandCompletion {
    fn get(&self, input: &str) -> Option<String> {
        if input.is_empty() {
            return None;
        }
        complete_from(input, COMMANDS.iter().copied())
    }
}

/// Completes file system paths at the repository path prompt
#[derive(Debug, Default)]
pub struct PathCompletion;

impl Completion for PathCompletion {
    fn get(&self, input: &str) -> Option<String> {
        let (dir, partial) = match input.rfind('/') {
            Some(index) => (&input[..=index], &input[index + 1..]),
            None => ("", input),
        };
        let search_dir = if dir.is_empty() { Path::new(".") } else { Path::new(dir) };

        let mut names: Vec<String> = std::fs::read_dir(search_dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let mut name = entry.file_name().to_str()?.to_string();
                if name.starts_with('.') && !partial.starts_with('.') {
                    return None;
                }
                if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                    name.push('/');
                }
                Some(name)
            })
            .collect();
        names.sort();

        let completed = complete_from(partial, names.iter().map(String::as_str))?;
        Some(format!("{dir}{completed}"))
    }
}
