use scaffold_config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteKind {
    #[default]
    Single,
    Double,
}

impl QuoteKind {
    pub fn char(&self) -> char {
        match self {
            QuoteKind::Single => '\'',
            QuoteKind::Double => '"',
        }
    }
}

/// Project-wide formatting used for every inserted snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManipulationSettings {
    pub quote: QuoteKind,
    pub trailing_commas: bool,
    pub indent: String,
}

impl Default for ManipulationSettings {
    fn default() -> Self {
        Self {
            quote: QuoteKind::Single,
            trailing_commas: true,
            indent: "    ".to_string(),
        }
    }
}

impl ManipulationSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            quote: if config.uses_double_quotes() {
                QuoteKind::Double
            } else {
                QuoteKind::Single
            },
            trailing_commas: config.trailing_commas(),
            indent: " ".repeat(config.indent_width()),
        }
    }

    /// Render `value` as a string literal in the configured quote style.
    pub fn quote(&self, value: &str) -> String {
        let q = self.quote.char();
        let mut out = String::with_capacity(value.len() + 2);
        out.push(q);
        for c in value.chars() {
            if c == q || c == '\\' {
                out.push('\\');
            }
            out.push(c);
        }
        out.push(q);
        out
    }

    pub(crate) fn trailing_comma(&self) -> &'static str {
        if self.trailing_commas {
            ","
        } else {
            ""
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_escapes_matching_quote() {
        let settings = ManipulationSettings::default();
        assert_eq!(settings.quote("it's"), r"'it\'s'");

        let double = ManipulationSettings {
            quote: QuoteKind::Double,
            ..ManipulationSettings::default()
        };
        assert_eq!(double.quote("it's"), "\"it's\"");
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.set("quote-style", "double").unwrap();
        config.set("indent-width", "2").unwrap();
        config.set("trailing-commas", "false").unwrap();
        let settings = ManipulationSettings::from_config(&config);
        assert_eq!(settings.quote, QuoteKind::Double);
        assert_eq!(settings.indent, "  ");
        assert_eq!(settings.trailing_comma(), "");
    }
}
