use std::fmt;

/// Characters that delimit the parts of a structural key.
const DELIMITERS: &[char] = &['\\', '*', '(', ')', '[', ']', '{', '}', ',', '=', ':', '/', ' '];

/// Displays a string as one component of a structural key.
///
/// Delimiter characters are prefixed with `\`, so that no value can
/// imitate the structure around it and distinct inputs keep distinct keys.
///
/// ```
/// use grounding_language::KeyComponent;
///
/// assert_eq!(KeyComponent("red,uid=b1").to_string(), r"red\,uid\=b1");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct KeyComponent<'a>(pub &'a str);

impl fmt::Display for KeyComponent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rest = self.0;
        while let Some(position) = rest.find(DELIMITERS) {
            let (plain, tail) = rest.split_at(position);
            let mut chars = tail.chars();
            let Some(delimiter) = chars.next() else {
                break;
            };
            write!(f, "{plain}\\{delimiter}")?;
            rest = chars.as_str();
        }
        f.write_str(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_escapes_only_delimiters() {
        assert_eq!(KeyComponent("+x").to_string(), "+x");
        assert_eq!(KeyComponent(r"a\(b) c").to_string(), r"a\\\(b\)\ c");
        assert_eq!(KeyComponent("").to_string(), "");
    }
}
