use regex::{Captures, Regex};
use std::collections::BTreeMap;
use thiserror::Error;

use super::compile_anchored;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unclosed placeholder starting at offset {0}")]
    Unclosed(usize),

    #[error("unmatched '}}' at offset {0}")]
    StrayBrace(usize),

    #[error("empty placeholder at offset {0}")]
    EmptyPlaceholder(usize),

    #[error("malformed placeholder '{{{token}}}': {reason}")]
    Malformed { token: String, reason: String },

    #[error("invalid pattern in placeholder '{{{token}}}': {reason}")]
    InvalidPattern { token: String, reason: String },

    #[error("unknown placeholder '{{{0}}}'")]
    UnknownToken(String),

    #[error("group {group} is out of range ({available} groups available)")]
    GroupOutOfRange { group: usize, available: usize },

    #[error("group '{0}' did not participate in the match")]
    GroupNotMatched(String),

    #[error("placeholder '{{{token}}}' did not match value '{value}'")]
    NoMatch { token: String, value: String },
}

/// Values a template may refer to: the capture groups of the rule that
/// matched, plus named variables such as `filename` and `extension`.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    groups: Vec<Option<String>>,
    named: BTreeMap<String, Option<String>>,
    vars: BTreeMap<String, String>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_captures(pattern: &Regex, captures: &Captures) -> Self {
        let groups = captures
            .iter()
            .map(|m| m.map(|m| m.as_str().to_string()))
            .collect();
        let named = pattern
            .capture_names()
            .flatten()
            .map(|name| {
                (
                    name.to_string(),
                    captures.name(name).map(|m| m.as_str().to_string()),
                )
            })
            .collect();
        Self {
            groups,
            named,
            vars: BTreeMap::new(),
        }
    }

    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_filename(self, base_name: &str, extension: Option<&str>) -> Self {
        let with_name = self.with_var("filename", base_name);
        match extension {
            Some(ext) => with_name.with_var("extension", ext),
            None => with_name,
        }
    }

    fn group(&self, index: usize) -> Result<&str, TemplateError> {
        match self.groups.get(index) {
            Some(Some(value)) => Ok(value),
            Some(None) => Err(TemplateError::GroupNotMatched(index.to_string())),
            None => Err(TemplateError::GroupOutOfRange {
                group: index,
                available: self.groups.len().saturating_sub(1),
            }),
        }
    }

    fn lookup(&self, name: &str) -> Result<&str, TemplateError> {
        if let Some(group) = self.named.get(name) {
            return group
                .as_deref()
                .ok_or_else(|| TemplateError::GroupNotMatched(name.to_string()));
        }
        self.vars
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| TemplateError::UnknownToken(name.to_string()))
    }

    fn resolve(&self, source: &Source) -> Result<&str, TemplateError> {
        match source {
            Source::Group(index) => self.group(*index),
            Source::Var(name) => self.lookup(name),
        }
    }
}

#[derive(Debug, Clone)]
enum Source {
    Group(usize),
    Var(String),
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Value(Source),
    Derived {
        token: String,
        source: Source,
        pattern: Regex,
        group: usize,
    },
}

/// A parsed rename template.
///
/// `{1}` inserts capture group 1, `{filename}` a context variable, and
/// `{name/regex/N}` group `N` of `regex` applied to the value of `name`.
/// `{{` and `}}` produce literal braces.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(TemplateError::StrayBrace(pos)),
                '{' => {
                    // Braces inside a placeholder nest, so `{1/\d{3}/0}` is one token.
                    let mut depth = 1;
                    let mut token = String::new();
                    for (_, t) in chars.by_ref() {
                        match t {
                            '{' => depth += 1,
                            '}' => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            }
                            _ => {}
                        }
                        token.push(t);
                    }
                    if depth != 0 {
                        return Err(TemplateError::Unclosed(pos));
                    }
                    if token.is_empty() {
                        return Err(TemplateError::EmptyPlaceholder(pos));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(parse_placeholder(&token)?);
                }
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn render(&self, context: &TemplateContext) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Value(source) => out.push_str(context.resolve(source)?),
                Segment::Derived {
                    token,
                    source,
                    pattern,
                    group,
                } => {
                    let value = context.resolve(source)?;
                    let captures =
                        pattern
                            .captures(value)
                            .ok_or_else(|| TemplateError::NoMatch {
                                token: token.clone(),
                                value: value.to_string(),
                            })?;
                    let matched = captures
                        .get(*group)
                        .ok_or_else(|| TemplateError::GroupNotMatched(group.to_string()))?;
                    out.push_str(matched.as_str());
                }
            }
        }
        Ok(out)
    }
}

/// Parse and render in one step.
pub fn render(template: &str, context: &TemplateContext) -> Result<String, TemplateError> {
    Template::parse(template)?.render(context)
}

fn parse_source(name: &str) -> Source {
    match name.parse::<usize>() {
        Ok(index) if name.bytes().all(|b| b.is_ascii_digit()) => Source::Group(index),
        _ => Source::Var(name.to_string()),
    }
}

fn parse_placeholder(token: &str) -> Result<Segment, TemplateError> {
    let (first, last) = match (token.find('/'), token.rfind('/')) {
        (Some(first), Some(last)) => (first, last),
        _ => return Ok(Segment::Value(parse_source(token))),
    };

    let malformed = |reason: &str| TemplateError::Malformed {
        token: token.to_string(),
        reason: reason.to_string(),
    };

    if first == last {
        return Err(malformed("expected name/regex/group"));
    }
    let name = &token[..first];
    let regex = &token[first + 1..last];
    let group_str = &token[last + 1..];

    if name.is_empty() {
        return Err(malformed("missing value name"));
    }
    let group: usize = group_str
        .parse()
        .map_err(|_| malformed("group index must be a non-negative integer"))?;
    let pattern = compile_anchored(regex).map_err(|e| TemplateError::InvalidPattern {
        token: token.to_string(),
        reason: e.to_string(),
    })?;
    let available = pattern.captures_len() - 1;
    if group > available {
        return Err(TemplateError::GroupOutOfRange { group, available });
    }

    Ok(Segment::Derived {
        token: token.to_string(),
        source: parse_source(name),
        pattern,
        group,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_for(pattern: &str, name: &str) -> TemplateContext {
        let re = compile_anchored(pattern).unwrap();
        let caps = re.captures(name).unwrap();
        TemplateContext::from_captures(&re, &caps).with_filename(name, Some("jpg"))
    }

    #[test]
    fn test_render_positional_group() {
        let ctx = context_for(r"(\d+)_p\d+", "12345_p0");
        assert_eq!(render("pixiv_{1}", &ctx).unwrap(), "pixiv_12345");
    }

    #[test]
    fn test_render_whole_match_and_vars() {
        let ctx = context_for(r"(\d+)_p", "12345_p0");
        assert_eq!(render("{0}|{filename}.{extension}", &ctx).unwrap(), "12345_p|12345_p0.jpg");
    }

    #[test]
    fn test_render_named_group() {
        let ctx = context_for(r"(?P<pid>\d+)_p(?P<page>\d+)", "777_p3");
        assert_eq!(render("{pid}-{page}", &ctx).unwrap(), "777-3");
    }

    #[test]
    fn test_render_reference_variable() {
        let ctx = TemplateContext::new().with_var("source", "pixiv");
        assert_eq!(render("{source}_x", &ctx).unwrap(), "pixiv_x");
    }

    #[test]
    fn test_render_derived_value() {
        let ctx = context_for(r"(\w+?)_(\d+)", "yande_00042_x");
        assert_eq!(render(r"{filename/\w+?_0*(\d+)/1}", &ctx).unwrap(), "42");
        assert_eq!(render(r"n{2/0*(\d{2})/1}", &ctx).unwrap(), "n42");
    }

    #[test]
    fn test_derived_value_is_anchored_at_start() {
        let ctx = TemplateContext::new().with_var("v", "abc123");
        let err = render(r"{v/(\d+)/1}", &ctx).unwrap_err();
        assert!(matches!(err, TemplateError::NoMatch { .. }));
    }

    #[test]
    fn test_escaped_braces() {
        let ctx = TemplateContext::new();
        assert_eq!(render("{{literal}}", &ctx).unwrap(), "{literal}");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Template::parse("abc{1").unwrap_err(), TemplateError::Unclosed(3));
        assert_eq!(Template::parse("a}b").unwrap_err(), TemplateError::StrayBrace(1));
        assert_eq!(Template::parse("x{}").unwrap_err(), TemplateError::EmptyPlaceholder(1));
        assert!(matches!(
            Template::parse("{name/only}").unwrap_err(),
            TemplateError::Malformed { .. }
        ));
        assert!(matches!(
            Template::parse("{name/(/1}").unwrap_err(),
            TemplateError::InvalidPattern { .. }
        ));
        assert_eq!(
            Template::parse(r"{name/(\d)/2}").unwrap_err(),
            TemplateError::GroupOutOfRange { group: 2, available: 1 }
        );
    }

    #[test]
    fn test_render_errors_are_explicit() {
        let ctx = context_for(r"(\d+)(x)?", "12");
        assert_eq!(
            render("{3}", &ctx).unwrap_err(),
            TemplateError::GroupOutOfRange { group: 3, available: 2 }
        );
        assert_eq!(
            render("{2}", &ctx).unwrap_err(),
            TemplateError::GroupNotMatched("2".to_string())
        );
        assert_eq!(
            render("{nope}", &ctx).unwrap_err(),
            TemplateError::UnknownToken("nope".to_string())
        );
    }

    #[test]
    fn test_render_is_deterministic() {
        let ctx = context_for(r"(\d+)_p\d+", "12345_p0");
        let template = Template::parse("pixiv_{1}_{missing}").unwrap();
        let first = template.render(&ctx);
        let second = template.render(&ctx);
        assert_eq!(first, second);

        let ok = Template::parse("pixiv_{1}").unwrap();
        assert_eq!(ok.render(&ctx), ok.render(&ctx));
    }
}
