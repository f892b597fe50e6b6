// fc-semantic/src/parsers/shell.rs
// ============================================================================
// Module: Shell Parser
// Description: POSIX-word-splitting-shaped tokenizer for shell command strings.
// Purpose: Give rules a structured view of a shell command instead of raw text.
// Dependencies: none
// ============================================================================

//! ## Overview
//! This is not a shell. It splits a command string into words the way
//! `/bin/sh` would (quotes, backslash escapes), then classifies words
//! starting with `-` as flags and everything else as positional args. The
//! pipe/redirect/background flags are raw substring checks against the
//! original command, matching the same shape of signal a full parse would
//! give without building a control-flow grammar for `|`, `&&`, `;`.

// ============================================================================
// SECTION: Tokens
// ============================================================================

/// Structured view of one shell command string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShellTokens {
    /// First token, conventionally the program name.
    pub program: String,
    /// Tokens after the program that start with `-`.
    pub flags: Vec<String>,
    /// Tokens after the program that don't start with `-`.
    pub args: Vec<String>,
    /// Every token in original order, including the program.
    pub raw_tokens: Vec<String>,
    /// Whether the raw command contains a pipe.
    pub has_pipe: bool,
    /// Whether the raw command contains a redirect (`>` or `<`).
    pub has_redirect: bool,
    /// Whether the raw command contains a background marker (`&`).
    pub has_background: bool,
}

/// Splits `command` into words, honoring single/double quotes and
/// backslash escapes outside of single quotes. Malformed quoting (an
/// unterminated quote) falls back to a plain whitespace split rather than
/// failing, matching a shell's practical behavior of still running
/// something.
#[must_use]
pub fn tokenize(command: &str) -> ShellTokens {
    let raw_tokens = split_words(command).unwrap_or_else(|| command.split_whitespace().map(str::to_string).collect());

    let mut flags = Vec::new();
    let mut args = Vec::new();
    let program = raw_tokens.first().cloned().unwrap_or_default();
    for token in raw_tokens.iter().skip(1) {
        if token.starts_with('-') {
            flags.push(token.clone());
        } else {
            args.push(token.clone());
        }
    }

    ShellTokens {
        program,
        flags,
        args,
        raw_tokens,
        has_pipe: command.contains('|'),
        has_redirect: command.contains('>') || command.contains('<'),
        has_background: command.contains('&'),
    }
}

fn split_words(command: &str) -> Option<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = command.chars();
    let mut quote: Option<char> = None;

    while let Some(ch) = chars.next() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some('\'') => current.push(ch),
            Some('"') => {
                if ch == '\\' {
                    match chars.next() {
                        Some(escaped @ ('"' | '\\' | '$' | '`')) => current.push(escaped),
                        Some(other) => {
                            current.push('\\');
                            current.push(other);
                        }
                        None => return None,
                    }
                } else {
                    current.push(ch);
                }
            }
            Some(_) => unreachable!("only ' and \" are tracked as open quotes"),
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    in_word = true;
                }
                '\\' => match chars.next() {
                    Some(escaped) => {
                        current.push(escaped);
                        in_word = true;
                    }
                    None => return None,
                },
                c if c.is_whitespace() => {
                    if in_word {
                        words.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                c => {
                    current.push(c);
                    in_word = true;
                }
            },
        }
    }

    if quote.is_some() {
        return None;
    }
    if in_word {
        words.push(current);
    }
    Some(words)
}

// ============================================================================
// SECTION: Dangerous Flag Combinations
// ============================================================================

/// Flags a few well-known dangerous flag/program combinations: recursive or
/// forced deletion, wide-open `chmod` targets, and `curl`/`wget` piped into
/// a shell.
#[must_use]
pub fn extract_dangerous_flags(tokens: &ShellTokens) -> Vec<String> {
    let mut dangerous = Vec::new();
    let program = tokens.program.to_lowercase();

    if matches!(program.as_str(), "rm" | "del" | "remove") {
        if tokens.flags.iter().any(|flag| flag == "-r" || flag == "-R" || flag == "--recursive") {
            dangerous.push("recursive_delete".to_string());
        }
        if tokens.flags.iter().any(|flag| flag == "-f" || flag == "--force") {
            dangerous.push("force_delete".to_string());
        }
    }

    if program == "chmod" {
        let dangerous_args = ["777", "000", "+x", "+w"];
        if tokens.args.iter().any(|arg| dangerous_args.contains(&arg.as_str())) {
            dangerous.push("dangerous_permissions".to_string());
        }
    }

    if matches!(program.as_str(), "curl" | "wget") && tokens.has_pipe {
        dangerous.push("download_and_execute".to_string());
    }

    dangerous
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions are permitted."
)]
mod tests {
    use super::*;

    #[test]
    fn splits_quoted_and_escaped_words() {
        let tokens = tokenize(r#"echo "hello world" 'literal $x' escaped\ space"#);
        assert_eq!(tokens.program, "echo");
        assert_eq!(tokens.args, vec!["hello world", "literal $x", "escaped space"]);
    }

    #[test]
    fn classifies_flags_and_args() {
        let tokens = tokenize("rm -rf /tmp/scratch");
        assert_eq!(tokens.program, "rm");
        assert_eq!(tokens.flags, vec!["-rf"]);
        assert_eq!(tokens.args, vec!["/tmp/scratch"]);
    }

    #[test]
    fn unterminated_quote_falls_back_to_whitespace_split() {
        let tokens = tokenize(r#"echo "unterminated"#);
        assert_eq!(tokens.raw_tokens, vec!["echo", "\"unterminated"]);
    }

    #[test]
    fn detects_curl_pipe_to_shell() {
        let tokens = tokenize("curl https://example.com/install.sh | sh");
        let dangerous = extract_dangerous_flags(&tokens);
        assert!(dangerous.contains(&"download_and_execute".to_string()));
    }

    #[test]
    fn detects_recursive_force_delete() {
        let tokens = tokenize("rm -r --force /");
        let dangerous = extract_dangerous_flags(&tokens);
        assert!(dangerous.contains(&"recursive_delete".to_string()));
        assert!(dangerous.contains(&"force_delete".to_string()));
    }
}
