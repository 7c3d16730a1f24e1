use crate::{*, error::*, gateway::*};

// C8: dlopen-based injection, falling back to __libc_dlopen_mode when the direct call fails or
// returns zero. Grounded on inject_with_dlopen_call. Only reports success/failure — it never
// tracks the returned handle.

fn parse_dlopen_result(text: &str) -> Option<i64> {
    // Looks for "$N = <integer>" and returns the integer.
    let eq = text.find('=')?;
    let rest = text[eq + 1..].trim();
    let digits_end = rest.find(|c: char| !c.is_ascii_digit() && c != '-').unwrap_or(rest.len());
    rest[..digits_end].parse::<i64>().ok()
}

fn call_dlopen(gw: &Gateway, function: &str, library_path: &str) -> Result<Option<bool>> {
    let cmd = format!("call {}(\"{}\", 1)", function, library_path);
    let opts = CommandOptions {cli_output: true, ..Default::default()};
    match gw.send_command(&cmd, opts)? {
        None => Ok(None),
        Some(resp) => {
            let text = resp.into_text().unwrap_or_default();
            Ok(Some(parse_dlopen_result(&text).map(|v| v != 0).unwrap_or(false)))
        }
    }
}

pub fn inject(gw: &Gateway, library_path: &str) -> Result<Option<bool>> {
    match call_dlopen(gw, "dlopen", library_path)? {
        None => Ok(None),
        Some(true) => Ok(Some(true)),
        Some(false) => call_dlopen(gw, "__libc_dlopen_mode", library_path),
    }
}

pub fn advanced_injection(_library_path: &str) -> Result<bool> {
    Err(Error::new(ErrorKind::NotImplemented, "advanced injection is not implemented".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_and_negative_dlopen_results() {
        assert_eq!(parse_dlopen_result("$1 = -1633996800"), Some(-1633996800));
        assert_eq!(parse_dlopen_result("$2 = 0"), Some(0));
        assert_eq!(parse_dlopen_result("$3 = 140198743834624"), Some(140198743834624));
    }

    #[test]
    fn unparseable_result_is_none() {
        assert_eq!(parse_dlopen_result("void"), None);
    }

    #[test]
    fn advanced_injection_signals_not_implemented() {
        let err = advanced_injection("/tmp/x.so").unwrap_err();
        assert!(err.is_not_implemented());
    }
}
