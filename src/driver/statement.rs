//! Splits a multi-statement script on top-level `;` boundaries, shared
//! by the drivers (MySQL, Cassandra) that must execute one statement at
//! a time over a connection with no native multi-statement support.
//! Separators inside single-quoted string literals, `--` line comments
//! and `/* */` block comments are not split on.
pub(super) fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = script.chars().peekable();
    let mut in_string = false;
    let mut in_line_comment = false;
    let mut in_block_comment = false;

    while let Some(c) = chars.next() {
        if in_line_comment {
            if c == '\n' {
                in_line_comment = false;
            }
            continue;
        }
        if in_block_comment {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                in_block_comment = false;
            }
            continue;
        }
        if in_string {
            current.push(c);
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    current.push(chars.next().unwrap());
                } else {
                    in_string = false;
                }
            }
            continue;
        }
        match c {
            '\'' => {
                in_string = true;
                current.push(c);
            }
            '-' if chars.peek() == Some(&'-') => {
                chars.next();
                in_line_comment = true;
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                in_block_comment = true;
            }
            ';' => {
                let trimmed = current.trim();
                if !trimmed.is_empty() {
                    statements.push(trimmed.to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
    statements
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_split_ignores_semicolons_in_strings_and_comments() {
        let script = "INSERT INTO t (a) VALUES ('a;b'); -- comment; with semi\nUPDATE t SET a = 1; /* block; comment */ DELETE FROM t;";
        let statements = split_statements(script);
        assert_eq!(statements.len(), 3);
        assert!(statements[0].contains("'a;b'"));
        assert_eq!(statements[1], "UPDATE t SET a = 1");
        assert_eq!(statements[2], "DELETE FROM t");
    }

    #[test]
    fn test_split_empty_script() {
        assert!(split_statements("   ").is_empty());
    }

    #[test]
    fn test_split_single_statement_no_trailing_semicolon() {
        let statements = split_statements("SELECT 1");
        assert_eq!(statements, vec!["SELECT 1"]);
    }
}
