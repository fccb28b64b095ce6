use crate::browser::Query;
use std::fmt;

/// One way of finding an element on a page whose markup is not under our control
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Raw CSS selector
    Css(String),

    /// Raw XPath expression
    XPath(String),

    /// Element whose `name` attribute equals the value
    Name(String),

    /// `<input>` of the given `type`
    InputType(String),

    /// `<input>` whose placeholder contains the value (case-insensitive)
    Placeholder(String),

    /// `<button>` whose text contains the value (case-insensitive)
    ButtonText(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn name(name: impl Into<String>) -> Self {
        Locator::Name(name.into())
    }

    pub fn input_type(kind: impl Into<String>) -> Self {
        Locator::InputType(kind.into())
    }

    pub fn button_text(text: impl Into<String>) -> Self {
        Locator::ButtonText(text.into())
    }

    /// Translate the strategy into a document query
    pub fn to_query(&self) -> Query {
        match self {
            Locator::Css(selector) => Query::Css(selector.clone()),
            Locator::XPath(expression) => Query::XPath(expression.clone()),
            Locator::Name(name) => Query::Css(format!("[name={}]", css_string(name))),
            Locator::InputType(kind) => Query::Css(format!("input[type={}]", css_string(kind))),
            Locator::Placeholder(text) => Query::Css(format!("input[placeholder*={} i]", css_string(text))),
            Locator::ButtonText(text) => Query::XPath(format!(
                "//button[contains(translate(normalize-space(.), 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), {})]",
                xpath_literal(&text.to_lowercase())
            )),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css({})", selector),
            Locator::XPath(expression) => write!(f, "xpath({})", expression),
            Locator::Name(name) => write!(f, "name({})", name),
            Locator::InputType(kind) => write!(f, "type({})", kind),
            Locator::Placeholder(text) => write!(f, "placeholder({})", text),
            Locator::ButtonText(text) => write!(f, "button-text({})", text),
        }
    }
}

/// Quote a value for use inside a CSS attribute selector
fn css_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Quote a value as an XPath 1.0 string literal.
///
/// XPath has no escape syntax, so values holding both quote kinds are split
/// and rebuilt with `concat()`.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }

    let parts: Vec<String> = value.split('\'').map(|part| format!("'{}'", part)).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_locators_render_css() {
        assert_eq!(Locator::name("email").to_query(), Query::css("[name=\"email\"]"));
        assert_eq!(Locator::input_type("password").to_query(), Query::css("input[type=\"password\"]"));
        assert_eq!(
            Locator::Placeholder("Email".into()).to_query(),
            Query::css("input[placeholder*=\"Email\" i]")
        );
    }

    #[test]
    fn test_raw_locators_pass_through() {
        assert_eq!(Locator::css("button[type='submit']").to_query(), Query::css("button[type='submit']"));
        assert_eq!(Locator::XPath("//form//button".into()).to_query(), Query::xpath("//form//button"));
    }

    #[test]
    fn test_button_text_is_case_insensitive_xpath() {
        match Locator::button_text("Sign In").to_query() {
            Query::XPath(expression) => {
                assert!(expression.starts_with("//button[contains(translate("));
                assert!(expression.ends_with("'sign in')]"));
            }
            other => panic!("Expected XPath query, got {:?}", other),
        }
    }

    #[test]
    fn test_css_string_escapes_quotes() {
        assert_eq!(css_string("a\"b"), "\"a\\\"b\"");
    }

    #[test]
    fn test_xpath_literal() {
        assert_eq!(xpath_literal("Max Stipend"), "'Max Stipend'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(xpath_literal("a'b\"c"), "concat('a', \"'\", 'b\"c')");
    }
}
