//! Template rendering for file contents and destination paths
//!
//! The syntax is the EJS tag set with configurable delimiters:
//!
//! | Tag        | Meaning                                         |
//! |------------|-------------------------------------------------|
//! | `<%= x %>` | output `x`, HTML-escaped                        |
//! | `<%- x %>` | output `x` unescaped                            |
//! | `<%# .. %>`| comment, produces nothing                       |
//! | `<%%`      | literal `<%`                                    |
//! | `-%>`      | close tag and drop the following newline        |
//! | `<%_ _%>`  | slurp surrounding spaces and tabs               |
//!
//! Expressions are dotted lookups into the context (`name`, `user.email`,
//! `locals.name`), quoted string literals, or `include('path')`. Includes are
//! resolved against the directory of the file being rendered and loaded
//! through a caller-supplied loader, so staged files can be included too.
//! Arbitrary scriptlets (`<% code %>`) are rejected.

use crate::error::{Error, Result};
use crate::path::normalize;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// Maximum nesting of `include()` calls before rendering gives up
const MAX_INCLUDE_DEPTH: usize = 32;

/// Delimiters used to recognise template tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TemplateSettings {
    /// Opening character, `<` by default
    pub open_delimiter: char,
    /// Tag character, `%` by default
    pub delimiter: char,
    /// Closing character, `>` by default
    pub close_delimiter: char,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            open_delimiter: '<',
            delimiter: '%',
            close_delimiter: '>',
        }
    }
}

impl TemplateSettings {
    /// Settings with a custom tag character, e.g. `?` for `<?= name ?>`
    pub fn with_delimiter(delimiter: char) -> Self {
        Self {
            delimiter,
            ..Self::default()
        }
    }
}

/// Loads the contents of an included file; `Ok(None)` when it does not exist.
pub type IncludeLoader<'a> = dyn Fn(&Path) -> Result<Option<String>> + 'a;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Escaped,
    Raw,
    Comment,
    Scriptlet,
}

struct Tokens {
    open: String,
    literal_open: String,
    literal_close: String,
    close: String,
    trim_close: String,
    slurp_close: String,
    regex: Regex,
}

impl Tokens {
    fn new(settings: &TemplateSettings) -> Result<Self> {
        let o = settings.open_delimiter;
        let d = settings.delimiter;
        let c = settings.close_delimiter;

        let open = format!("{o}{d}");
        let literal_open = format!("{o}{d}{d}");
        let literal_close = format!("{d}{d}{c}");
        let close = format!("{d}{c}");
        let trim_close = format!("-{d}{c}");
        let slurp_close = format!("_{d}{c}");

        let alternatives = [
            literal_open.clone(),
            literal_close.clone(),
            format!("{open}="),
            format!("{open}-"),
            format!("{open}_"),
            format!("{open}#"),
            open.clone(),
            trim_close.clone(),
            slurp_close.clone(),
            close.clone(),
        ];
        let pattern = alternatives
            .iter()
            .map(|a| regex::escape(a))
            .collect::<Vec<_>>()
            .join("|");

        Ok(Self {
            open,
            literal_open,
            literal_close,
            close,
            trim_close,
            slurp_close,
            regex: Regex::new(&pattern)?,
        })
    }

    fn opening(&self, token: &str) -> Option<(Tag, bool)> {
        let rest = token.strip_prefix(self.open.as_str())?;
        match rest {
            "=" => Some((Tag::Escaped, false)),
            "-" => Some((Tag::Raw, false)),
            "#" => Some((Tag::Comment, false)),
            "_" => Some((Tag::Scriptlet, true)),
            "" => Some((Tag::Scriptlet, false)),
            _ => None,
        }
    }

    fn is_closing(&self, token: &str) -> bool {
        token == self.close || token == self.trim_close || token == self.slurp_close
    }
}

/// Whitespace handling owed to the text following a closing tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trim {
    None,
    Newline,
    Slurp,
}

fn apply_trim(text: &str, trim: Trim) -> &str {
    match trim {
        Trim::None => text,
        Trim::Newline => text
            .strip_prefix("\r\n")
            .or_else(|| text.strip_prefix('\n'))
            .unwrap_or(text),
        Trim::Slurp => {
            let text = text.trim_start_matches([' ', '\t']);
            text.strip_prefix("\r\n")
                .or_else(|| text.strip_prefix('\n'))
                .unwrap_or(text)
        }
    }
}

/// HTML-escape output the way `<%=` does
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(format_value).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

struct Renderer<'a> {
    tokens: Tokens,
    settings: TemplateSettings,
    context: &'a Value,
    loader: Option<&'a IncludeLoader<'a>>,
    include_re: Regex,
    ident_re: Regex,
}

impl<'a> Renderer<'a> {
    fn new(
        settings: &TemplateSettings,
        context: &'a Value,
        loader: Option<&'a IncludeLoader<'a>>,
    ) -> Result<Self> {
        Ok(Self {
            tokens: Tokens::new(settings)?,
            settings: *settings,
            context,
            loader,
            include_re: Regex::new(r#"^include\s*\(\s*(?:'([^']*)'|"([^"]*)")\s*\)$"#)?,
            ident_re: Regex::new(r"^[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*$")?,
        })
    }

    fn render(&self, template: &str, filename: Option<&Path>, depth: usize) -> Result<String> {
        let mut out = String::with_capacity(template.len());
        let mut open: Option<(Tag, &str)> = None;
        let mut code = String::new();
        let mut trim = Trim::None;
        let mut last = 0;

        for m in self.tokens.regex.find_iter(template) {
            let chunk = &template[last..m.start()];
            last = m.end();
            let token = m.as_str();

            match open {
                None => {
                    out.push_str(apply_trim(chunk, trim));
                    trim = Trim::None;

                    if token == self.tokens.literal_open {
                        out.push_str(&self.tokens.open);
                    } else if token == self.tokens.literal_close {
                        out.push_str(&self.tokens.close);
                    } else if let Some((tag, slurp_before)) = self.tokens.opening(token) {
                        if slurp_before {
                            let kept = out.trim_end_matches([' ', '\t']).len();
                            out.truncate(kept);
                        }
                        open = Some((tag, token));
                        code.clear();
                    } else {
                        // A closing tag outside of a tag is plain text
                        out.push_str(token);
                    }
                }
                Some((tag, opened_with)) => {
                    code.push_str(chunk);
                    if token == self.tokens.literal_close {
                        code.push_str(&self.tokens.close);
                    } else if self.tokens.is_closing(token) {
                        out.push_str(&self.evaluate(tag, &code, filename, depth)?);
                        trim = if token == self.tokens.trim_close {
                            Trim::Newline
                        } else if token == self.tokens.slurp_close {
                            Trim::Slurp
                        } else {
                            Trim::None
                        };
                        open = None;
                    } else {
                        return Err(Error::Template {
                            message: format!(
                                "Could not find matching close tag for \"{}\"",
                                opened_with
                            ),
                            variable: None,
                        });
                    }
                }
            }
        }

        if let Some((_, opened_with)) = open {
            return Err(Error::Template {
                message: format!("Could not find matching close tag for \"{}\"", opened_with),
                variable: None,
            });
        }
        out.push_str(apply_trim(&template[last..], trim));
        Ok(out)
    }

    fn evaluate(
        &self,
        tag: Tag,
        code: &str,
        filename: Option<&Path>,
        depth: usize,
    ) -> Result<String> {
        let expr = code.trim().trim_end_matches(';').trim();
        match tag {
            Tag::Comment => Ok(String::new()),
            Tag::Scriptlet if expr.is_empty() => Ok(String::new()),
            Tag::Scriptlet => Err(Error::Template {
                message: format!("Scriptlets are not supported: {}", expr),
                variable: None,
            }),
            Tag::Escaped => Ok(escape_html(&self.expression(expr, filename, depth)?)),
            Tag::Raw => self.expression(expr, filename, depth),
        }
    }

    fn expression(&self, expr: &str, filename: Option<&Path>, depth: usize) -> Result<String> {
        if let Some(caps) = self.include_re.captures(expr) {
            let target = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            return self.include(target, filename, depth);
        }

        for quote in ['\'', '"'] {
            if expr.len() >= 2 && expr.starts_with(quote) && expr.ends_with(quote) {
                return Ok(expr[1..expr.len() - 1].to_string());
            }
        }

        if self.ident_re.is_match(expr) {
            return self.lookup(expr);
        }

        Err(Error::Template {
            message: format!("Unsupported expression: {}", expr),
            variable: None,
        })
    }

    fn lookup(&self, expr: &str) -> Result<String> {
        let path = expr.strip_prefix("locals.").unwrap_or(expr);
        let mut parts = path.split('.');
        let head = parts.next().unwrap_or_default();

        let Some(mut value) = self.context.get(head) else {
            return Err(Error::Template {
                message: format!("{} is not defined", head),
                variable: Some(head.to_string()),
            });
        };
        for part in parts {
            match value.get(part) {
                Some(next) => value = next,
                None => return Ok(String::new()),
            }
        }
        Ok(format_value(value))
    }

    fn include(&self, target: &str, filename: Option<&Path>, depth: usize) -> Result<String> {
        let not_found = |message: String| Error::Template {
            message,
            variable: None,
        };

        let (Some(loader), Some(filename)) = (self.loader, filename) else {
            return Err(not_found(format!(
                "include('{}') requires a template file name",
                target
            )));
        };
        if depth >= MAX_INCLUDE_DEPTH {
            return Err(not_found(format!(
                "include('{}') nested too deeply in {}",
                target,
                filename.display()
            )));
        }

        let base = filename.parent().unwrap_or_else(|| Path::new("/"));
        let mut resolved = normalize(&base.join(target));
        let mut contents = loader(&resolved)?;
        if contents.is_none() && resolved.extension().is_none() {
            resolved.set_extension("ejs");
            contents = loader(&resolved)?;
        }
        let Some(contents) = contents else {
            return Err(not_found(format!(
                "Could not find the include file \"{}\"",
                resolved.display()
            )));
        };

        log::debug!("including {} ({:?})", resolved.display(), self.settings);
        self.render(&contents, Some(&resolved), depth + 1)
    }
}

/// Render a template, resolving includes relative to `filename` through `loader`.
pub fn render(
    template: &str,
    context: &Value,
    settings: &TemplateSettings,
    filename: &Path,
    loader: &IncludeLoader<'_>,
) -> Result<String> {
    Renderer::new(settings, context, Some(loader))?.render(template, Some(filename), 0)
}

/// Render a template string that has no file of its own (e.g. a destination path).
pub fn render_str(template: &str, context: &Value, settings: &TemplateSettings) -> Result<String> {
    Renderer::new(settings, context, None)?.render(template, None, 0)
}
