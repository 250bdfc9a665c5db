//! The two library functions every program gets for free: `print` and
//! `input`. Both are resolved by name in the VM's `call` handler rather than
//! going through a user-defined label, since they talk to the process's
//! actual stdio.

use std::io::{self, Write};

use crate::error::{CorvidError, Result};
use crate::value::Value;

/// `print(fmt, ...args)`. With no arguments, prints a bare newline. With a
/// leading string argument, treats it as a template: a literal backslash
/// stands for a newline (so templates can end a line without embedding one
/// at the lexer level), and each `{}` is replaced, in order, by the
/// remaining arguments' display text. A non-string leading argument instead
/// prints every argument space-separated, like a plain `print(*args)`.
pub fn print(args: &[Value]) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.first() {
        None => {
            writeln!(out).map_err(|e| CorvidError::Io(e.to_string()))?;
        }
        Some(Value::Str(template)) => {
            let template = template.replace('\\', "\n");
            let rendered = format_template(&template, &args[1..]);
            write!(out, "{rendered}").map_err(|e| CorvidError::Io(e.to_string()))?;
        }
        Some(_) => {
            let parts: Vec<String> = args.iter().map(|v| v.to_string()).collect();
            writeln!(out, "{}", parts.join(" ")).map_err(|e| CorvidError::Io(e.to_string()))?;
        }
    }
    out.flush().map_err(|e| CorvidError::Io(e.to_string()))
}

/// `input(prompt)`. Writes `prompt` with no trailing newline, then reads and
/// returns one line from stdin (without its terminator).
pub fn input(args: &[Value]) -> Result<Value> {
    let prompt = match args.first() {
        Some(Value::Str(s)) => s.clone(),
        Some(v) => v.to_string(),
        None => String::new(),
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write!(out, "{prompt}").map_err(|e| CorvidError::Io(e.to_string()))?;
    out.flush().map_err(|e| CorvidError::Io(e.to_string()))?;

    let mut line = String::new();
    io::stdin().read_line(&mut line).map_err(|e| CorvidError::Io(e.to_string()))?;
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Ok(Value::Str(line))
}

/// Replaces each literal `{}` in `template`, left to right, with the display
/// text of the next value in `args`. Placeholders past the end of `args`
/// are left untouched; extra `args` are ignored.
fn format_template(template: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '{' && chars.peek() == Some(&'}') {
            chars.next();
            match args.next() {
                Some(v) => out.push_str(&v.to_string()),
                None => out.push_str("{}"),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_placeholders_in_order() {
        let rendered = format_template("{} plus {} is {}", &[Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(rendered, "1 plus 2 is 3");
    }

    #[test]
    fn leftover_placeholder_is_left_as_is() {
        let rendered = format_template("{} and {}", &[Value::Int(1)]);
        assert_eq!(rendered, "1 and {}");
    }

    #[test]
    fn backslash_in_template_becomes_newline() {
        let rendered = "line one\\line two".replace('\\', "\n");
        assert_eq!(rendered, "line one\nline two");
    }
}
